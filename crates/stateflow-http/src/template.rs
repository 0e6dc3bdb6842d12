//! Request path templates
//!
//! `{0}`, `{1}`... expand to the handle's key parts, `{id}` to the innermost
//! part and `{type}` to the resource type. `{{` and `}}` are literal braces.

use crate::error::{HttpError, Result};
use stateflow_core::ResourceHandle;

/// Expand `template` for `handle`
pub fn render_path(template: &str, handle: &ResourceHandle) -> Result<String> {
    let invalid = |reason: String| HttpError::InvalidTemplate {
        template: template.to_string(),
        reason,
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => return Err(invalid("unclosed '{'".to_string())),
                    }
                }
                out.push_str(&placeholder(&name, handle).map_err(invalid)?);
            }
            '}' => return Err(invalid("unmatched '}'".to_string())),
            c => out.push(c),
        }
    }

    Ok(out)
}

fn placeholder(name: &str, handle: &ResourceHandle) -> std::result::Result<String, String> {
    match name {
        "id" => Ok(handle.id().to_string()),
        "type" => Ok(handle.resource_type().to_string()),
        _ => {
            let index: usize = name
                .parse()
                .map_err(|_| format!("unknown placeholder '{{{}}}'", name))?;
            handle.part(index).map(str::to_string).ok_or_else(|| {
                format!(
                    "placeholder '{{{}}}' but {} has {} key part(s)",
                    index,
                    handle,
                    handle.parts().len()
                )
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_part() {
        let handle = ResourceHandle::new("server", "113200001");
        assert_eq!(
            render_path("/servers/{0}", &handle).unwrap(),
            "/servers/113200001"
        );
        assert_eq!(
            render_path("/{type}s/{id}/power", &handle).unwrap(),
            "/servers/113200001/power"
        );
    }

    #[test]
    fn test_composite_key() {
        let handle = ResourceHandle::composite("record", ["zone-1", "rec-9"]);
        assert_eq!(
            render_path("/zones/{0}/records/{1}", &handle).unwrap(),
            "/zones/zone-1/records/rec-9"
        );
    }

    #[test]
    fn test_escaped_braces() {
        let handle = ResourceHandle::new("server", "1");
        assert_eq!(
            render_path("/a/{{literal}}/{0}", &handle).unwrap(),
            "/a/{literal}/1"
        );
    }

    #[test]
    fn test_invalid_templates() {
        let handle = ResourceHandle::new("server", "1");

        for template in ["/servers/{1}", "/servers/{0", "/servers/0}", "/servers/{name}"] {
            let err = render_path(template, &handle).unwrap_err();
            assert!(
                matches!(err, HttpError::InvalidTemplate { .. }),
                "{} should be rejected",
                template
            );
        }
    }
}

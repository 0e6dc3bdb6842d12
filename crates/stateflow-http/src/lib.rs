//! JSON-over-HTTP adapter for stateflow
//!
//! Builds a [`StatusProbe`](stateflow_core::StatusProbe) and
//! [`Mutation`](stateflow_core::Mutation)s for control planes that expose
//! resources as `GET /things/{id}` returning JSON with a status field.
//!
//! ```ignore
//! use stateflow_http::{HttpClient, HttpFinder, HttpMutation};
//!
//! let client = HttpClient::new("https://api.example.com/v1").with_token(token);
//! let probe = HttpFinder::new(client.clone(), "/servers/{0}")
//!     .with_status_pointer("/instance_status")
//!     .into_probe();
//! let delete = HttpMutation::delete(client, "/servers/{0}");
//! ```

pub mod classify;
pub mod client;
pub mod error;
pub mod finder;
pub mod mutation;
pub mod template;

pub use classify::HttpErrorClassifier;
pub use client::HttpClient;
pub use error::{HttpError, Result};
pub use finder::HttpFinder;
pub use mutation::HttpMutation;
pub use template::render_path;

pub use reqwest::Method;

use stateflow_core::FinderProbe;

/// Probe over an [`HttpFinder`]
pub type HttpProbe = FinderProbe<HttpFinder, HttpErrorClassifier>;

impl HttpFinder {
    /// Probe using the default status-code classification
    pub fn into_probe(self) -> HttpProbe {
        FinderProbe::new(self, HttpErrorClassifier::default())
    }

    pub fn into_probe_with(self, classifier: HttpErrorClassifier) -> HttpProbe {
        FinderProbe::new(self, classifier)
    }
}

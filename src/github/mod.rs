pub mod client;
pub mod history;
pub mod queries;
pub mod repos;
pub mod user;

pub use client::{HttpTransport, QueryClient, QueryCounter, QueryName, Transport, TransportResponse, DEFAULT_ENDPOINT};
pub use history::{HistorySource, HistoryWalker};
pub use repos::{list_repositories, star_summary, Affiliation, RepositoryPages, StarSummary};

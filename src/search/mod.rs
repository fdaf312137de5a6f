pub mod fusion;
pub mod hybrid;
pub mod hydrate;
pub mod retriever;

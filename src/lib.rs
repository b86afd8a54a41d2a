pub mod api;
pub mod app;
pub mod db;
pub mod errors;
pub mod models;

#[cfg(test)]
mod test;

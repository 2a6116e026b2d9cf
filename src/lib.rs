pub mod config;
pub mod docker;
pub mod logging;
pub mod output;
pub mod pipeline;

#[cfg(test)]
mod test_support;

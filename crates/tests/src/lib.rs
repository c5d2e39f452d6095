//! Workspace integration tests; see the modules for scenarios.

#[cfg(test)]
mod routing_integration;

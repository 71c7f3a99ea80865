// Integration tests follow the organization suggested by Matklad:
// https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod graph_loading;
mod network_failures;
mod network_flow;
mod network_monitoring;

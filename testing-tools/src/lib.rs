// Testing Tools Library
//
// End-to-end probes for a running event stream server.
// Currently includes:
// - sse-test-client: connects to /stream and /status and checks what comes back

pub mod output;
pub mod scenarios;
pub mod sse_client;

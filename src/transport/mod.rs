//! HTTP transport shared by the robot clients.
//!
//! Tuned through environment variables:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ROBOT_HTTP_TIMEOUT_SECS` | 10 |
//! | `ROBOT_HTTP_POOL_MAX_IDLE_PER_HOST` | 8 |
//! | `ROBOT_PROXY_URL` | unset |

pub mod http;

pub use http::{check_api_code, HttpTransport, TransportError};

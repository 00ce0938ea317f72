//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements           | Connects to                  |
//! |------------|----------------------|------------------------------|
//! | `identity` | -                    | eFuse MAC / simulated ID     |
//! | `log_sink` | EventSink            | `log` facade                 |
//! | `mqtt`     | MqttPort             | rumqttc client + net thread  |
//! | `runtime`  | MqttPort + TimerPort | worker loop and timer queue  |

pub mod identity;
pub mod log_sink;
pub mod mqtt;
pub mod runtime;

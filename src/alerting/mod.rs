//! The alerting core: message rendering, multi-channel dispatch and the
//! per-kind cooldown state machine.

mod dispatcher;
mod engine;
mod messages;

pub use dispatcher::{AlertDispatcher, FanOutOutcome, TestAlertOutcome};
pub use engine::{
    ALERT_HISTORY_STATE_KEY, AlertCheckReport, AlertEngine, AlertEngineError, COOLDOWN_STATE_PREFIX,
    FiredAlert, KindCooldownState, KindCooldownStatus, SuppressedAlert,
};
pub use messages::render_alert_message;

use tracing::debug;
use ugvlink_protocol::{Request, Response};

use crate::state::SlaveState;

/// Answer one parsed request, updating `state` as a side effect.
pub(crate) fn respond(request: &Request, state: &SlaveState) -> Response {
    match request {
        Request::Ready => Response::Ack,
        Request::Move(setpoints) => {
            debug!(right = setpoints.right, left = setpoints.left, "move accepted");
            state.record_move(*setpoints);
            Response::Ack
        }
        Request::Telemetry(kind) => {
            if state.battery_fault() {
                return Response::BatteryError;
            }
            let value = state.battery().value(*kind);
            Response::Telemetry {
                kind: *kind,
                payload: value.to_le_bytes().to_vec(),
            }
        }
    }
}

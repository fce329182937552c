// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Snapshot of the motion controller for status reporting.

use serde::Serialize;

use crate::motion::values::{StepCounts, MAX_AXES};

/// Position and state, serialized with camelCase keys.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionStatus {
    /// Working-space position derived from the steps actually issued.
    pub position: [f32; MAX_AXES],
    /// Steps from home actually issued.
    pub steps: StepCounts,
    /// `[min, max]` end-stop readings per axis; false where none is fitted.
    pub endstops: [[bool; 2]; MAX_AXES],
    /// Blocks waiting in or executing from the pipeline.
    pub queued: usize,
    pub paused: bool,
    /// An end-stop test aborted a block since the last resume or stop.
    pub endstop_hit: bool,
    pub homing: bool,
    pub homed: bool,
    pub relative: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let status = MotionStatus {
            position: [1.5, -2.0, 0.0],
            steps: [150, -200, 0],
            endstops: [[true, false], [false, false], [false, false]],
            queued: 3,
            homed: true,
            ..Default::default()
        };
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["position"][0], 1.5);
        assert_eq!(json["steps"][1], -200);
        assert_eq!(json["endstops"][0][0], true);
        assert_eq!(json["queued"], 3);
        assert_eq!(json["homed"], true);
        assert_eq!(json["paused"], false);
        assert_eq!(json["endstopHit"], false);
        assert_eq!(json["relative"], false);
    }
}

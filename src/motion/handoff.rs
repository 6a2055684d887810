// Single-writer / single-reader handoff between the command layer and the
// actuator driver. Built on a tokio watch channel: the reader always sees the
// latest frame, and a new frame replaces the old one before it is consumed.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::joints::JOINT_COUNT;

/// Where motion requests go once targets are written
pub trait MotionSink {
    /// Ask the actuators to start moving toward `targets`
    fn begin_motion(&mut self, targets: &[i32; JOINT_COUNT]);

    /// Change the global actuator speed (degrees per second)
    fn set_speed(&mut self, speed: u16);
}

/// Snapshot handed to the driver side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionFrame {
    pub targets: [i32; JOINT_COUNT],
    pub speed: u16,
    /// Incremented on every request, lets the reader detect skipped frames
    pub sequence: u64,
}

/// Writer half, owned by the position command layer
#[derive(Debug)]
pub struct CommandHandoff {
    tx: watch::Sender<MotionFrame>,
    frame: MotionFrame,
}

/// Reader half, owned by the actuator driver task
#[derive(Debug)]
pub struct CommandFeed {
    rx: watch::Receiver<MotionFrame>,
}

/// Create a connected handoff pair seeded with the start pose
pub fn handoff(start: [i32; JOINT_COUNT], speed: u16) -> (CommandHandoff, CommandFeed) {
    let frame = MotionFrame {
        targets: start,
        speed,
        sequence: 0,
    };
    let (tx, rx) = watch::channel(frame);
    (CommandHandoff { tx, frame }, CommandFeed { rx })
}

impl CommandHandoff {
    /// Last frame published
    pub fn frame(&self) -> &MotionFrame {
        &self.frame
    }

    fn publish(&mut self) {
        self.frame.sequence += 1;
        // send_replace never fails, even when the driver side is gone
        self.tx.send_replace(self.frame);
    }
}

impl MotionSink for CommandHandoff {
    fn begin_motion(&mut self, targets: &[i32; JOINT_COUNT]) {
        self.frame.targets = *targets;
        self.publish();
    }

    fn set_speed(&mut self, speed: u16) {
        self.frame.speed = speed;
        self.publish();
    }
}

impl CommandFeed {
    /// Latest frame if it changed since the last call
    pub fn latest(&mut self) -> Option<MotionFrame> {
        match self.rx.has_changed() {
            Ok(true) => Some(*self.rx.borrow_and_update()),
            _ => None,
        }
    }

    /// Current frame regardless of whether it was already seen
    pub fn current(&self) -> MotionFrame {
        *self.rx.borrow()
    }

    /// Wait for the next frame; `None` once the writer is dropped
    pub async fn next(&mut self) -> Option<MotionFrame> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_sees_latest_frame_only() {
        let (mut tx, mut rx) = handoff([90; JOINT_COUNT], 60);
        assert_eq!(rx.latest(), None);

        let mut targets = [90; JOINT_COUNT];
        targets[0] = 100;
        tx.begin_motion(&targets);
        targets[0] = 110;
        tx.begin_motion(&targets);

        let frame = rx.latest().unwrap();
        assert_eq!(frame.targets[0], 110);
        assert_eq!(frame.sequence, 2);
        assert_eq!(rx.latest(), None);
    }

    #[test]
    fn test_speed_change_is_a_new_frame() {
        let (mut tx, mut rx) = handoff([0; JOINT_COUNT], 60);
        tx.set_speed(120);
        let frame = rx.latest().unwrap();
        assert_eq!(frame.speed, 120);
        assert_eq!(frame.targets, [0; JOINT_COUNT]);
    }

    #[test]
    fn test_writer_survives_dropped_reader() {
        let (mut tx, rx) = handoff([0; JOINT_COUNT], 60);
        drop(rx);
        tx.begin_motion(&[1; JOINT_COUNT]);
        assert_eq!(tx.frame().targets, [1; JOINT_COUNT]);
    }

    #[tokio::test]
    async fn test_next_ends_when_writer_dropped() {
        let (mut tx, mut rx) = handoff([0; JOINT_COUNT], 60);
        tx.begin_motion(&[5; JOINT_COUNT]);
        assert_eq!(rx.next().await.map(|f| f.targets), Some([5; JOINT_COUNT]));
        drop(tx);
        assert_eq!(rx.next().await, None);
    }
}

// Actuator drivers for the biped joints
//
// The motion core never talks to hardware directly: it publishes frames on the
// command handoff, and `run_driver` forwards them to an ActuatorDriver.

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::protocol::{Easing, Order, ServoBus, ServoError};
use crate::motion::{CommandFeed, JOINT_COUNT, JointIndex, JointRange};

/// Capabilities the motion runtime needs from an actuator backend
pub trait ActuatorDriver {
    /// Attach a joint and park it at `start`
    fn attach(&mut self, joint: JointIndex, start: i32) -> Result<(), ServoError>;

    /// Install the driver-side min/max clamp for a joint
    fn set_limits(&mut self, joint: JointIndex, range: &JointRange) -> Result<(), ServoError>;

    fn set_easing(&mut self, easing: Easing) -> Result<(), ServoError>;

    /// Global speed in degrees per second
    fn set_speed(&mut self, speed: u16) -> Result<(), ServoError>;

    /// Start moving every joint toward its target
    fn write_targets(&mut self, targets: &[i32; JOINT_COUNT]) -> Result<(), ServoError>;
}

/// Attach every joint at its home angle and configure the driver
///
/// Joints are attached in index order, which is the order the remote side
/// expects.
pub fn initialize<D: ActuatorDriver + ?Sized>(
    driver: &mut D,
    ranges: &[JointRange; JOINT_COUNT],
    home: &[i32; JOINT_COUNT],
    easing: Easing,
    speed: u16,
) -> Result<(), ServoError> {
    info!("Attaching {} joints", JOINT_COUNT);
    for joint in JointIndex::ALL {
        driver.attach(joint, home[joint.index()])?;
    }
    for joint in JointIndex::ALL {
        driver.set_limits(joint, &ranges[joint.index()])?;
    }
    driver.set_easing(easing)?;
    driver.set_speed(speed)?;
    info!("Joints initialised");
    Ok(())
}

/// Drain the command feed into a driver until the writer side goes away
///
/// `status` is set to false after a failed write and back to true after the
/// next successful one.
pub async fn run_driver<D: ActuatorDriver + Send>(
    mut driver: D,
    mut feed: CommandFeed,
    status: watch::Sender<bool>,
) {
    let mut speed = feed.current().speed;
    let mut last_sequence = feed.current().sequence;

    while let Some(frame) = feed.next().await {
        if frame.sequence > last_sequence + 1 {
            debug!(
                "Driver skipped {} superseded frames",
                frame.sequence - last_sequence - 1
            );
        }
        last_sequence = frame.sequence;

        if frame.speed != speed {
            if let Err(e) = driver.set_speed(frame.speed) {
                warn!("Failed to set speed {}: {}", frame.speed, e);
                status.send_replace(false);
                continue;
            }
            speed = frame.speed;
        }

        match driver.write_targets(&frame.targets) {
            Ok(()) => {
                status.send_replace(true);
            }
            Err(e) => {
                warn!("Failed to write targets: {}", e);
                status.send_replace(false);
            }
        }
    }
    info!("Command feed closed, driver stopping");
}

/// Driver for the serial servo board
pub struct SerialServoDriver {
    bus: ServoBus,
}

impl SerialServoDriver {
    /// Connect to the board on `port` and make sure it answers
    pub fn open(port: &str, baudrate: u32) -> Result<Self, ServoError> {
        info!("Opening servo board on {} at {} baud", port, baudrate);
        let mut bus = ServoBus::open_with_baudrate(port, baudrate)?;
        if !bus.ping()? {
            warn!("Servo board not responding to ping");
            return Err(ServoError::Timeout { order: Order::Ping });
        }
        Ok(Self { bus })
    }

    pub fn ping(&mut self) -> Result<bool, ServoError> {
        self.bus.ping()
    }
}

impl ActuatorDriver for SerialServoDriver {
    fn attach(&mut self, joint: JointIndex, start: i32) -> Result<(), ServoError> {
        debug!("Attach {} at {}", joint, start);
        self.bus.attach(joint, start)
    }

    fn set_limits(&mut self, joint: JointIndex, range: &JointRange) -> Result<(), ServoError> {
        self.bus.set_limits(joint, range)
    }

    fn set_easing(&mut self, easing: Easing) -> Result<(), ServoError> {
        self.bus.set_easing(easing)
    }

    fn set_speed(&mut self, speed: u16) -> Result<(), ServoError> {
        self.bus.set_speed(speed)
    }

    fn write_targets(&mut self, targets: &[i32; JOINT_COUNT]) -> Result<(), ServoError> {
        self.bus.write_targets(targets)
    }
}

/// Stand-in driver when hardware is disabled; remembers what it was sent
#[derive(Debug, Default, Clone)]
pub struct SimulatedDriver {
    pub attached: Vec<(JointIndex, i32)>,
    pub limits: Vec<(JointIndex, JointRange)>,
    pub easing: Option<Easing>,
    pub speed: Option<u16>,
    pub targets: Option<[i32; JOINT_COUNT]>,
    pub writes: usize,
}

impl ActuatorDriver for SimulatedDriver {
    fn attach(&mut self, joint: JointIndex, start: i32) -> Result<(), ServoError> {
        self.attached.push((joint, start));
        Ok(())
    }

    fn set_limits(&mut self, joint: JointIndex, range: &JointRange) -> Result<(), ServoError> {
        self.limits.push((joint, *range));
        Ok(())
    }

    fn set_easing(&mut self, easing: Easing) -> Result<(), ServoError> {
        self.easing = Some(easing);
        Ok(())
    }

    fn set_speed(&mut self, speed: u16) -> Result<(), ServoError> {
        self.speed = Some(speed);
        Ok(())
    }

    fn write_targets(&mut self, targets: &[i32; JOINT_COUNT]) -> Result<(), ServoError> {
        debug!("Simulated targets: {:?}", targets);
        self.targets = Some(*targets);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{MotionSink, handoff};

    #[test]
    fn test_initialize_attaches_in_index_order() {
        let mut driver = SimulatedDriver::default();
        let ranges = [JointRange::new(0, 180); JOINT_COUNT];
        let home = [10, 20, 30, 40, 50, 60, 70, 80];
        initialize(&mut driver, &ranges, &home, Easing::Cubic, 45).unwrap();

        let order: Vec<JointIndex> = driver.attached.iter().map(|(j, _)| *j).collect();
        assert_eq!(order, JointIndex::ALL.to_vec());
        assert_eq!(driver.attached[5], (JointIndex::RightAnkle, 60));
        assert_eq!(driver.limits.len(), JOINT_COUNT);
        assert_eq!(driver.easing, Some(Easing::Cubic));
        assert_eq!(driver.speed, Some(45));
    }

    /// Driver that shares its state with the test through a channel
    struct ForwardingDriver(tokio::sync::mpsc::UnboundedSender<([i32; JOINT_COUNT], Option<u16>)>);

    impl ActuatorDriver for ForwardingDriver {
        fn attach(&mut self, _: JointIndex, _: i32) -> Result<(), ServoError> {
            Ok(())
        }
        fn set_limits(&mut self, _: JointIndex, _: &JointRange) -> Result<(), ServoError> {
            Ok(())
        }
        fn set_easing(&mut self, _: Easing) -> Result<(), ServoError> {
            Ok(())
        }
        fn set_speed(&mut self, speed: u16) -> Result<(), ServoError> {
            let _ = self.0.send(([0; JOINT_COUNT], Some(speed)));
            Ok(())
        }
        fn write_targets(&mut self, targets: &[i32; JOINT_COUNT]) -> Result<(), ServoError> {
            let _ = self.0.send((*targets, None));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_driver_forwards_frames() {
        let (mut tx, feed) = handoff([90; JOINT_COUNT], 60);
        let (events_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(false);
        let task = tokio::spawn(run_driver(ForwardingDriver(events_tx), feed, status_tx));

        tx.begin_motion(&[100; JOINT_COUNT]);
        assert_eq!(events.recv().await, Some(([100; JOINT_COUNT], None)));

        tx.set_speed(30);
        assert_eq!(events.recv().await, Some(([0; JOINT_COUNT], Some(30))));
        assert_eq!(events.recv().await, Some(([100; JOINT_COUNT], None)));

        drop(tx);
        task.await.unwrap();
        assert!(*status.borrow());
    }
}

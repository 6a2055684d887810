// 50 Hz command loop
// Drains every command topic, applies the commands to the motion coordinator,
// and publishes the commanded joint state and driver health. Servo writes
// happen in a separate task fed through the command handoff.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{
    LOOP_HZ, RobotConfig, TOPIC_CMD_LEG, TOPIC_CMD_POSE, TOPIC_CMD_RESET, TOPIC_CMD_SERVO,
    TOPIC_CMD_SPEED, TOPIC_HEALTH, TOPIC_SENSOR_TILT, TOPIC_STATE_JOINTS,
};
use crate::messages::{
    JointState, LegCommand, PoseCommand, ResetCommand, RuntimeHealth, ServoCommand, SpeedCommand,
    TiltReading,
};
use crate::motion::{
    BalanceCorrector, CommandFeed, CommandHandoff, JOINT_COUNT, MotionCoordinator,
    PositionCommander, handoff,
};
use crate::servo::{ActuatorDriver, SerialServoDriver, SimulatedDriver, initialize, run_driver};

pub struct Runtime {
    motion: MotionCoordinator<CommandHandoff>,
    home: [i32; JOINT_COUNT],
    driver_ok: watch::Receiver<bool>,
    health: RuntimeHealth,
}

impl Runtime {
    /// Build the motion core from `config`; returns the feed for the driver task
    pub fn new(config: &RobotConfig, driver_ok: watch::Receiver<bool>) -> (Self, CommandFeed) {
        let (writer, feed) = handoff(config.home_pose(), config.servo.speed);
        let commander = match config.random_seed {
            Some(seed) => {
                PositionCommander::with_seed(config.ranges(), config.home_pose(), writer, seed)
            }
            None => PositionCommander::new(config.ranges(), config.home_pose(), writer),
        };
        let motion = MotionCoordinator::new(
            config.leg_solver(),
            BalanceCorrector::new(config.balance),
            commander,
            config.servo.speed,
        );

        let runtime = Self {
            motion,
            home: config.home_pose(),
            driver_ok,
            health: RuntimeHealth::Ok,
        };
        (runtime, feed)
    }

    pub fn motion(&self) -> &MotionCoordinator<CommandHandoff> {
        &self.motion
    }

    fn on_leg(&mut self, cmd: LegCommand) {
        debug!("Leg command: {:?}", cmd);
        if let Err(e) = self.motion.move_leg(cmd.x, cmd.y) {
            warn!("Ignoring leg command: {}", e);
        }
    }

    fn on_pose(&mut self, cmd: PoseCommand) {
        debug!("Pose command: {:?}", cmd);
        self.motion.move_all(&cmd.targets());
    }

    fn on_servo(&mut self, cmd: ServoCommand) {
        debug!("Servo command: {:?}", cmd);
        match cmd {
            ServoCommand::Set { joint, value, mode } => {
                self.motion.set_target(joint, value, mode);
            }
            ServoCommand::Random { joint } => {
                self.motion.random_target(joint);
            }
        }
    }

    fn on_speed(&mut self, cmd: SpeedCommand) {
        self.motion.set_speed(cmd.speed);
    }

    fn on_reset(&mut self, _cmd: ResetCommand) {
        self.motion.reset(&self.home);
    }

    fn on_tilt(&mut self, reading: TiltReading) {
        if let Some(correction) = self.motion.correct_tilt(reading.pitch) {
            info!(
                "Pitch {:.1}: hips {:+.1}/{:+.1}",
                reading.pitch, correction.left, correction.right
            );
        }
    }

    /// Refresh health from the driver task's status
    fn update_health(&mut self) -> RuntimeHealth {
        let health = if *self.driver_ok.borrow() {
            RuntimeHealth::Ok
        } else {
            RuntimeHealth::DriverFault
        };
        if health != self.health {
            match health {
                RuntimeHealth::Ok => info!("Driver recovered"),
                RuntimeHealth::DriverFault => warn!("Driver fault, servos may not follow commands"),
            }
        }
        self.health = health;
        health
    }

    fn joint_state(&self) -> JointState {
        JointState {
            positions: *self.motion.positions(),
            hip_adjustment: self.motion.hip_adjustment(),
            foot: self
                .motion
                .current_foot()
                .map(|foot| LegCommand { x: foot.x, y: foot.y }),
            speed: self.motion.speed(),
        }
    }
}

/// Parse a JSON payload, logging instead of failing
fn parse<T: DeserializeOwned>(topic: &str, payload: &[u8]) -> Option<T> {
    match serde_json::from_slice::<T>(payload) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("Failed to parse message on {}: {}", topic, e);
            None
        }
    }
}

/// Attach the joints and start the task that streams targets to the driver
///
/// Driver calls block on serial I/O, so the task runs on the blocking pool
/// instead of a runtime worker.
fn spawn_driver<D>(
    mut driver: D,
    config: &RobotConfig,
    feed: CommandFeed,
    status: watch::Sender<bool>,
) -> Result<tokio::task::JoinHandle<()>, Box<dyn std::error::Error + Send + Sync>>
where
    D: ActuatorDriver + Send + 'static,
{
    initialize(
        &mut driver,
        &config.ranges(),
        &config.home_pose(),
        config.servo.easing,
        config.servo.speed,
    )?;
    let handle = tokio::runtime::Handle::current();
    Ok(tokio::task::spawn_blocking(move || {
        handle.block_on(run_driver(driver, feed, status))
    }))
}

pub async fn run(
    config: RobotConfig,
    hardware: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (status_tx, status_rx) = watch::channel(true);
    let (mut runtime, feed) = Runtime::new(&config, status_rx);

    let _driver_task = if hardware {
        let driver = SerialServoDriver::open(&config.servo.port, config.servo.baudrate)?;
        spawn_driver(driver, &config, feed, status_tx)?
    } else {
        info!("Hardware disabled, using simulated servos");
        spawn_driver(SimulatedDriver::default(), &config, feed, status_tx)?
    };

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_leg = session.declare_subscriber(TOPIC_CMD_LEG).await?;
    let sub_pose = session.declare_subscriber(TOPIC_CMD_POSE).await?;
    let sub_servo = session.declare_subscriber(TOPIC_CMD_SERVO).await?;
    let sub_speed = session.declare_subscriber(TOPIC_CMD_SPEED).await?;
    let sub_reset = session.declare_subscriber(TOPIC_CMD_RESET).await?;
    let sub_tilt = session.declare_subscriber(TOPIC_SENSOR_TILT).await?;
    let pub_state = session.declare_publisher(TOPIC_STATE_JOINTS).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!("Runtime started: {}Hz loop", LOOP_HZ);
    info!(
        "Subscribed to: {}, {}, {}, {}, {}, {}",
        TOPIC_CMD_LEG,
        TOPIC_CMD_POSE,
        TOPIC_CMD_SERVO,
        TOPIC_CMD_SPEED,
        TOPIC_CMD_RESET,
        TOPIC_SENSOR_TILT
    );
    info!("Publishing to: {}, {}", TOPIC_STATE_JOINTS, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending messages (non-blocking), in arrival order per topic
        while let Ok(Some(sample)) = sub_reset.try_recv() {
            if let Some(cmd) = parse(TOPIC_CMD_RESET, &sample.payload().to_bytes()) {
                runtime.on_reset(cmd);
            }
        }
        while let Ok(Some(sample)) = sub_tilt.try_recv() {
            if let Some(reading) = parse(TOPIC_SENSOR_TILT, &sample.payload().to_bytes()) {
                runtime.on_tilt(reading);
            }
        }
        while let Ok(Some(sample)) = sub_speed.try_recv() {
            if let Some(cmd) = parse(TOPIC_CMD_SPEED, &sample.payload().to_bytes()) {
                runtime.on_speed(cmd);
            }
        }
        while let Ok(Some(sample)) = sub_pose.try_recv() {
            if let Some(cmd) = parse(TOPIC_CMD_POSE, &sample.payload().to_bytes()) {
                runtime.on_pose(cmd);
            }
        }
        while let Ok(Some(sample)) = sub_leg.try_recv() {
            if let Some(cmd) = parse(TOPIC_CMD_LEG, &sample.payload().to_bytes()) {
                runtime.on_leg(cmd);
            }
        }
        while let Ok(Some(sample)) = sub_servo.try_recv() {
            if let Some(cmd) = parse(TOPIC_CMD_SERVO, &sample.payload().to_bytes()) {
                runtime.on_servo(cmd);
            }
        }

        // 2. Publish commanded state
        let state_json = serde_json::to_string(&runtime.joint_state())?;
        pub_state.put(state_json).await?;

        // 3. Publish health
        let health = runtime.update_health();
        let health_json = serde_json::to_string(&health)?;
        pub_health.put(health_json).await?;
    }
}

// Keyboard teleop: W/S foot fwd/back, R/F foot up/down, J/L pan, I/K tilt, P random pose, Q quit
use biped_zenoh_runtime::config::{TOPIC_CMD_LEG, TOPIC_CMD_POSE, TOPIC_CMD_SERVO};
use biped_zenoh_runtime::messages::{LegCommand, PoseCommand, ServoCommand};
use biped_zenoh_runtime::motion::{CommandMode, JOINT_COUNT, JointIndex, JointTarget};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::Duration;
use tracing::info;

const FOOT_STEP: f64 = 0.25; // leg length units per key press
const NECK_STEP_PERCENT: i32 = 5; // percent of the neck range per key press
const START_FOOT: (f64, f64) = (0.0, -9.0);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_leg = session.declare_publisher(TOPIC_CMD_LEG).await?;
    let pub_servo = session.declare_publisher(TOPIC_CMD_SERVO).await?;
    let pub_pose = session.declare_publisher(TOPIC_CMD_POSE).await?;

    info!("Controls: W/S=foot fwd/back, R/F=foot up/down, J/L=pan, I/K=tilt, P=random neck, Q=quit");

    enable_raw_mode()?;
    let result = run_teleop(&pub_leg, &pub_servo, &pub_pose).await;
    disable_raw_mode()?;

    result
}

async fn run_teleop(
    pub_leg: &zenoh::pubsub::Publisher<'_>,
    pub_servo: &zenoh::pubsub::Publisher<'_>,
    pub_pose: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut x, mut y) = START_FOOT;
    publish_foot(pub_leg, x, y).await?;

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if !event::poll(Duration::from_millis(20))? {
            continue;
        }
        let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
            continue;
        };
        if kind != KeyEventKind::Press && kind != KeyEventKind::Repeat {
            continue;
        }

        match code {
            // Foot target - runtime drops targets the leg cannot reach
            KeyCode::Char('w') => {
                x += FOOT_STEP;
                publish_foot(pub_leg, x, y).await?;
            }
            KeyCode::Char('s') => {
                x -= FOOT_STEP;
                publish_foot(pub_leg, x, y).await?;
            }
            KeyCode::Char('r') => {
                y += FOOT_STEP;
                publish_foot(pub_leg, x, y).await?;
            }
            KeyCode::Char('f') => {
                y -= FOOT_STEP;
                publish_foot(pub_leg, x, y).await?;
            }

            // Neck, as a percentage of each joint's range
            KeyCode::Char('j') => nudge(pub_servo, JointIndex::NeckPan, -NECK_STEP_PERCENT).await?,
            KeyCode::Char('l') => nudge(pub_servo, JointIndex::NeckPan, NECK_STEP_PERCENT).await?,
            KeyCode::Char('i') => nudge(pub_servo, JointIndex::NeckTilt, NECK_STEP_PERCENT).await?,
            KeyCode::Char('k') => nudge(pub_servo, JointIndex::NeckTilt, -NECK_STEP_PERCENT).await?,

            // Random neck pose, legs untouched
            KeyCode::Char('p') => {
                let mut joints = [JointTarget::Keep; JOINT_COUNT];
                joints[JointIndex::NeckTilt.index()] = JointTarget::Randomize;
                joints[JointIndex::NeckPan.index()] = JointTarget::Randomize;
                let cmd = PoseCommand::Tagged { joints };
                pub_pose.put(serde_json::to_string(&cmd)?).await?;
                info!("Random neck pose");
            }

            // Quit
            KeyCode::Char('q') | KeyCode::Esc => break,

            _ => {}
        }
    }

    Ok(())
}

async fn publish_foot(
    publisher: &zenoh::pubsub::Publisher<'_>,
    x: f64,
    y: f64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cmd = LegCommand { x, y };
    publisher.put(serde_json::to_string(&cmd)?).await?;
    info!("Foot: ({:.2}, {:.2})", x, y);
    Ok(())
}

async fn nudge(
    publisher: &zenoh::pubsub::Publisher<'_>,
    joint: JointIndex,
    percent: i32,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cmd = ServoCommand::Set {
        joint,
        value: percent,
        mode: CommandMode::PercentOfRange,
    };
    publisher.put(serde_json::to_string(&cmd)?).await?;
    Ok(())
}

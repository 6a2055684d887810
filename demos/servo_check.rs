// Servo check: step-by-step test of the servo board link
//
// Usage: cargo run --example servo_check -- [port] [config.json]
// Example: cargo run --example servo_check -- /dev/ttyUSB0
//
// Pings the board, attaches every joint at its home angle, then nods the neck.
// Legs are only attached, never moved.

use biped_zenoh_runtime::config::{RobotConfig, SERVO_PORT};
use biped_zenoh_runtime::motion::JointIndex;
use biped_zenoh_runtime::servo::{ActuatorDriver, SerialServoDriver, initialize};
use std::io::{self, Write};
use std::thread::sleep;
use std::time::Duration;

const NOD_DEGREES: i32 = 10;

fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    input.trim().eq_ignore_ascii_case("y")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("debug".parse().unwrap()),
        )
        .init();

    let port = std::env::args().nth(1).unwrap_or_else(|| SERVO_PORT.to_string());
    let config = match std::env::args().nth(2) {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    println!("Servo board check");
    println!("Serial port: {}", port);
    println!();

    println!("Step 1: Opening serial port and pinging board...");
    let mut driver = match SerialServoDriver::open(&port, config.servo.baudrate) {
        Ok(driver) => {
            println!("  ✓ Board responding");
            driver
        }
        Err(e) => {
            println!("  ✗ {}", e);
            println!();
            println!("Troubleshooting:");
            println!("  - Check the port path is correct");
            println!("  - Verify the board is powered and flashed");
            println!("  - Check the baudrate ({})", config.servo.baudrate);
            return Err(e.into());
        }
    };
    println!();

    if !confirm("Attach all joints at their home angles? The robot will move.") {
        println!("Aborted.");
        return Ok(());
    }

    println!("Step 2: Attaching joints...");
    let home = config.home_pose();
    initialize(
        &mut driver,
        &config.ranges(),
        &home,
        config.servo.easing,
        config.servo.speed,
    )?;
    for joint in JointIndex::ALL {
        let range = config.ranges()[joint.index()];
        println!(
            "  {:<12} home {:>4}  range [{}, {}]",
            joint.name(),
            home[joint.index()],
            range.min,
            range.max
        );
    }
    println!();

    // Wait for servos to reach the start pose
    sleep(Duration::from_secs(3));

    println!("Step 3: Neck nod...");
    let tilt = JointIndex::NeckTilt;
    let tilt_range = config.ranges()[tilt.index()];
    for offset in [NOD_DEGREES, -NOD_DEGREES, 0] {
        let mut targets = home;
        targets[tilt.index()] = tilt_range.clamp(home[tilt.index()] + offset);
        driver.write_targets(&targets)?;
        println!("  neck tilt -> {}", targets[tilt.index()]);
        sleep(Duration::from_secs(1));
    }

    println!();
    println!("Check complete. Run the runtime with: cargo run -- --port {}", port);
    Ok(())
}

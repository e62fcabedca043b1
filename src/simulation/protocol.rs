//! # Line protocol spoken to the simulation executable.
//!
//! The executable is launched as
//! ```text
//! <executable> --charging <int> --loading <int> --duration <int> --config stdin
//! ```
//! and reads its configuration from stdin:
//! ```text
//! DRONE <speed> <battery>                                   (one per drone)
//! TASK <warehouse> <customer> <priority> <estimatedTime>    (one per task)
//! START
//! ```
//! after which stdin is closed. The format is fixed by the simulation core.

use std::fmt::{self, Write as _};

use super::request::SimulationRequest;

/// Terminator line of the configuration script.
pub const START: &str = "START";

/// Positional arguments passed to the executable.
pub fn args(req: &SimulationRequest) -> Vec<String> {
    vec![
        "--charging".to_string(),
        req.charging.to_string(),
        "--loading".to_string(),
        req.loading.to_string(),
        "--duration".to_string(),
        req.duration.to_string(),
        "--config".to_string(),
        "stdin".to_string(),
    ]
}

/// Configuration script written to the executable's stdin, newline-terminated.
pub fn script(req: &SimulationRequest) -> String {
    let mut out = String::new();
    for drone in &req.drones {
        let _ = writeln!(out, "DRONE {} {}", Num(drone.speed), Num(drone.battery));
    }
    for task in &req.tasks {
        let _ = writeln!(
            out,
            "TASK {} {} {} {}",
            task.warehouse,
            task.customer,
            Num(task.priority),
            Num(task.estimated_time)
        );
    }
    out.push_str(START);
    out.push('\n');
    out
}

/// A number rendered as JavaScript's `String(n)` renders it: shortest
/// round-trip digits, no fractional part for integral values, exponent form
/// below `1e-6` and from `1e21` up.
struct Num(f64);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        if v == 0.0 {
            // also -0
            return f.write_str("0");
        }

        let abs = v.abs();
        if !(1e-6..1e21).contains(&abs) {
            let sci = format!("{v:e}");
            return match sci.split_once('e') {
                Some((mantissa, exp)) if !exp.starts_with('-') => write!(f, "{mantissa}e+{exp}"),
                _ => f.write_str(&sci),
            };
        }
        write!(f, "{v}")
    }
}

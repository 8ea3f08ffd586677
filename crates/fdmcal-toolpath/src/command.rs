//! Command stream: the ordered lines of a G-code document.
//!
//! Numeric fields are rounded when a [`Command`] is constructed, so the
//! stream holds exactly the values that will be printed. Feed rates are kept
//! as velocities in mm/s and only converted to mm/min when formatted.

use std::fmt;

/// Decimal places for pressure-advance (K) values.
pub const PA_PLACES: u32 = 4;
/// Decimal places for Z coordinates.
pub const Z_PLACES: u32 = 3;
/// Decimal places for X/Y coordinates.
pub const XY_PLACES: u32 = 4;
/// Decimal places for extrusion lengths.
pub const E_PLACES: u32 = 5;

/// Conversion from mm/s to the mm/min unit used by `F` words.
pub const FEED_SCALE: f64 = 60.0;

/// Round `value` to `places` decimal places.
///
/// Negative zero is normalised to zero so it never prints as `-0`.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Feed word value (mm/min, truncated) for a velocity in mm/s.
pub fn feed_rate(speed: f64) -> u32 {
    (speed * FEED_SCALE).max(0.0) as u32
}

/// Fan PWM value (0-255) for a percentage.
pub fn fan_pwm(percent: u32) -> u32 {
    (percent.min(100) as f64 / 100.0 * 255.0) as u32
}

/// One line of the command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `; text`
    Comment(String),
    /// Empty line.
    Blank,
    /// `G0` rapid move. Unset axes are omitted.
    Rapid {
        /// Target X (mm).
        x: Option<f64>,
        /// Target Y (mm).
        y: Option<f64>,
        /// Target Z (mm).
        z: Option<f64>,
        /// Velocity (mm/s).
        speed: f64,
    },
    /// `G1` linear move, optionally extruding.
    Linear {
        /// Target X (mm).
        x: Option<f64>,
        /// Target Y (mm).
        y: Option<f64>,
        /// Target Z (mm).
        z: Option<f64>,
        /// Relative filament length (mm).
        e: Option<f64>,
        /// Velocity (mm/s).
        speed: f64,
    },
    /// `G92 E0`
    ResetExtruder,
    /// `M104` (set) or `M109` (set and wait) hotend temperature.
    HotendTemp {
        /// Target temperature (°C).
        celsius: u32,
        /// Block until the temperature is reached.
        wait: bool,
    },
    /// `M106` part-cooling fan.
    Fan {
        /// Fan speed (0-100 %).
        percent: u32,
    },
    /// `M900 K` pressure advance.
    PressureAdvance {
        /// Advance coefficient.
        k: f64,
    },
    /// `M117` display message.
    Display(String),
    /// Verbatim line, e.g. from a start/end template.
    Raw(String),
}

impl Command {
    /// Comment line.
    pub fn comment(text: impl Into<String>) -> Self {
        Command::Comment(text.into())
    }

    /// Rapid move with rounded coordinates.
    pub fn rapid(x: Option<f64>, y: Option<f64>, z: Option<f64>, speed: f64) -> Self {
        Command::Rapid {
            x: x.map(|v| round_to(v, XY_PLACES)),
            y: y.map(|v| round_to(v, XY_PLACES)),
            z: z.map(|v| round_to(v, Z_PLACES)),
            speed,
        }
    }

    /// Linear move with rounded coordinates and extrusion.
    pub fn linear(
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        e: Option<f64>,
        speed: f64,
    ) -> Self {
        Command::Linear {
            x: x.map(|v| round_to(v, XY_PLACES)),
            y: y.map(|v| round_to(v, XY_PLACES)),
            z: z.map(|v| round_to(v, Z_PLACES)),
            e: e.map(|v| round_to(v, E_PLACES)),
            speed,
        }
    }

    /// Pressure-advance coefficient, rounded to [`PA_PLACES`].
    pub fn pressure_advance(k: f64) -> Self {
        Command::PressureAdvance {
            k: round_to(k, PA_PLACES),
        }
    }

    /// Does this command move the toolhead?
    pub fn is_move(&self) -> bool {
        matches!(self, Command::Rapid { .. } | Command::Linear { .. })
    }

    /// Extrusion carried by this command, if any.
    pub fn extrusion(&self) -> Option<f64> {
        match self {
            Command::Linear { e, .. } => *e,
            _ => None,
        }
    }
}

fn write_axis(f: &mut fmt::Formatter<'_>, letter: char, value: Option<f64>) -> fmt::Result {
    match value {
        Some(v) => write!(f, " {letter}{v}"),
        None => Ok(()),
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Comment(text) => write!(f, "; {text}"),
            Command::Blank => Ok(()),
            Command::Rapid { x, y, z, speed } => {
                f.write_str("G0")?;
                write_axis(f, 'X', *x)?;
                write_axis(f, 'Y', *y)?;
                write_axis(f, 'Z', *z)?;
                write!(f, " F{}", feed_rate(*speed))
            }
            Command::Linear { x, y, z, e, speed } => {
                f.write_str("G1")?;
                write_axis(f, 'X', *x)?;
                write_axis(f, 'Y', *y)?;
                write_axis(f, 'Z', *z)?;
                write_axis(f, 'E', *e)?;
                write!(f, " F{}", feed_rate(*speed))
            }
            Command::ResetExtruder => f.write_str("G92 E0"),
            Command::HotendTemp { celsius, wait: true } => {
                write!(f, "M109 S{celsius} ; wait for {celsius} C")
            }
            Command::HotendTemp {
                celsius,
                wait: false,
            } => write!(f, "M104 S{celsius}"),
            Command::Fan { percent } => {
                write!(f, "M106 S{} ; part-cooling fan {percent} %", fan_pwm(*percent))
            }
            Command::PressureAdvance { k } => write!(f, "M900 K{k}"),
            Command::Display(text) => write!(f, "M117 {text}"),
            Command::Raw(line) => f.write_str(line),
        }
    }
}

/// Append-only, ordered command stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    commands: Vec<Command>,
}

impl Program {
    /// Create an empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    /// Commands in emission order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Sum of all positive extrusion (mm of filament).
    pub fn filament_used(&self) -> f64 {
        self.commands
            .iter()
            .filter_map(Command::extrusion)
            .filter(|e| *e > 0.0)
            .sum()
    }

    /// Render as newline-terminated G-code text, one command per line.
    pub fn to_gcode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for command in &self.commands {
            writeln!(f, "{command}")?;
        }
        Ok(())
    }
}

//! Motion state and the primitive emitter.
//!
//! [`Emitter`] owns the [`MotionState`] for one generation pass and is the
//! only way moves enter the [`Program`]. Every drawing helper takes the
//! emitter as its receiver or as `&mut Emitter`.

use serde::{Deserialize, Serialize};

use crate::command::{Command, Program};
use crate::extrusion::{Bead, ExtrusionModel};
use crate::path::{Point2, Polygon, Polyline};

/// Travels longer than this (planar, mm) retract before leaving.
pub const AUTO_RETRACT_DISTANCE: f64 = 2.0;

/// Draws shorter than this (mm) are dropped.
const MIN_DRAW_LENGTH: f64 = 1e-6;

/// Toolhead position and cumulative extruder total.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Position {
    /// X (mm).
    pub x: f64,
    /// Y (mm).
    pub y: f64,
    /// Nominal layer Z (mm), excluding any active hop.
    pub z: f64,
    /// Cumulative filament since the last extruder reset (mm).
    pub e: f64,
}

impl Position {
    /// Planar distance to a point.
    pub fn planar_distance(&self, x: f64, y: f64) -> f64 {
        (x - self.x).hypot(y - self.y)
    }
}

/// Filament state at the nozzle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetractState {
    /// Filament is primed.
    #[default]
    Extended,
    /// Filament is pulled back.
    Retracted,
}

/// Everything the emitter needs to remember between calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionState {
    /// Current position.
    pub position: Position,
    /// Retraction state.
    pub retract: RetractState,
    /// Whether the nozzle is currently lifted by a z-hop.
    pub hop_active: bool,
}

impl MotionState {
    /// Is the filament retracted?
    pub fn is_retracted(&self) -> bool {
        self.retract == RetractState::Retracted
    }
}

/// Retraction, hop and travel parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSettings {
    /// Retraction length (mm).
    pub retract_length: f64,
    /// Retraction velocity (mm/s).
    pub retract_speed: f64,
    /// Prime velocity after a retraction (mm/s).
    pub unretract_speed: f64,
    /// Lift applied while retracted (mm), 0 disables.
    pub zhop: f64,
    /// Travel velocity (mm/s).
    pub travel_speed: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            retract_length: 0.6,
            retract_speed: 45.0,
            unretract_speed: 45.0,
            zhop: 0.1,
            travel_speed: 150.0,
        }
    }
}

/// Builds the command stream while tracking motion state.
#[derive(Debug, Clone)]
pub struct Emitter {
    state: MotionState,
    settings: MotionSettings,
    model: ExtrusionModel,
    program: Program,
}

impl Emitter {
    /// Start a pass at the origin with primed filament.
    pub fn new(settings: MotionSettings, model: ExtrusionModel) -> Self {
        Self {
            state: MotionState::default(),
            settings,
            model,
            program: Program::new(),
        }
    }

    /// Current motion state.
    pub fn state(&self) -> &MotionState {
        &self.state
    }

    /// Extrusion model in use.
    pub fn model(&self) -> &ExtrusionModel {
        &self.model
    }

    /// Commands emitted so far.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Append an arbitrary command.
    pub fn push(&mut self, command: Command) {
        self.program.push(command);
    }

    /// Append a comment line.
    pub fn comment(&mut self, text: impl Into<String>) {
        self.program.push(Command::comment(text));
    }

    /// Append an empty line.
    pub fn blank(&mut self) {
        self.program.push(Command::Blank);
    }

    /// Append each line of a rendered template verbatim.
    pub fn raw_block(&mut self, text: &str) {
        for line in text.lines() {
            self.program.push(Command::Raw(line.to_string()));
        }
    }

    /// Pull the filament back, then hop if configured. No-op when already retracted.
    pub fn retract(&mut self) {
        if self.state.is_retracted() {
            return;
        }
        let s = self.settings;
        self.program.push(Command::linear(
            None,
            None,
            None,
            Some(-s.retract_length),
            s.retract_speed,
        ));
        self.state.position.e -= s.retract_length;
        self.state.retract = RetractState::Retracted;

        if s.zhop > 0.0 && !self.state.hop_active {
            self.program.push(Command::rapid(
                None,
                None,
                Some(self.state.position.z + s.zhop),
                s.travel_speed,
            ));
            self.state.hop_active = true;
        }
    }

    /// Drop any hop, then prime the filament. No-op when not retracted.
    pub fn unretract(&mut self) {
        if !self.state.is_retracted() {
            return;
        }
        let s = self.settings;
        if self.state.hop_active {
            self.program.push(Command::rapid(
                None,
                None,
                Some(self.state.position.z),
                s.travel_speed,
            ));
            self.state.hop_active = false;
        }
        self.program.push(Command::linear(
            None,
            None,
            None,
            Some(s.retract_length),
            s.unretract_speed,
        ));
        self.state.position.e += s.retract_length;
        self.state.retract = RetractState::Extended;
    }

    /// Non-extruding move.
    ///
    /// A planar move longer than [`AUTO_RETRACT_DISTANCE`] from a primed
    /// state is wrapped in a retract/unretract pair. An explicit `z` lands
    /// the nozzle at that height and ends any hop.
    pub fn travel(&mut self, x: f64, y: f64, z: Option<f64>) {
        let far = self.state.position.planar_distance(x, y) > AUTO_RETRACT_DISTANCE;
        let auto = far && !self.state.is_retracted();
        if auto {
            self.retract();
        }

        self.program
            .push(Command::rapid(Some(x), Some(y), z, self.settings.travel_speed));
        self.state.position.x = x;
        self.state.position.y = y;
        if let Some(z) = z {
            self.state.position.z = z;
            self.state.hop_active = false;
        }

        if auto {
            self.unretract();
        }
    }

    /// Extruding move with an explicit filament length. Primes first if retracted.
    pub fn draw(&mut self, x: f64, y: f64, z: Option<f64>, extrude: f64, speed: f64) {
        self.unretract();
        let cmd = Command::linear(Some(x), Some(y), z, Some(extrude), speed);
        if let Some(e) = cmd.extrusion() {
            self.state.position.e += e;
        }
        self.program.push(cmd);
        self.state.position.x = x;
        self.state.position.y = y;
        if let Some(z) = z {
            self.state.position.z = z;
        }
    }

    /// Extrude a straight bead from the current position to `(x, y)`.
    pub fn line_to(&mut self, x: f64, y: f64, bead: Bead) {
        let distance = self.state.position.planar_distance(x, y);
        if distance < MIN_DRAW_LENGTH {
            return;
        }
        let e = self.model.length(distance, bead);
        self.draw(x, y, None, e, bead.speed);
    }

    /// Travel to the first point of `path` and extrude along the rest.
    pub fn trace(&mut self, path: &Polyline, bead: Bead) {
        let Some(start) = path.start() else {
            return;
        };
        self.travel(start.x, start.y, None);
        for p in path.points.iter().skip(1) {
            self.line_to(p.x, p.y, bead);
        }
    }

    /// Extrude a closed loop starting and ending at its first vertex.
    pub fn trace_loop(&mut self, polygon: &Polygon, bead: Bead) {
        let Some(&start) = polygon.points.first() else {
            return;
        };
        self.travel(start.x, start.y, None);
        for p in polygon.points.iter().skip(1) {
            self.line_to(p.x, p.y, bead);
        }
        self.line_to(start.x, start.y, bead);
    }

    /// Extrude a single stroke from `a` to `b`.
    pub fn stroke(&mut self, a: Point2, b: Point2, bead: Bead) {
        self.travel(a.x, a.y, None);
        self.line_to(b.x, b.y, bead);
    }

    /// Reset the extruder coordinate to zero.
    pub fn e_reset(&mut self) {
        self.program.push(Command::ResetExtruder);
        self.state.position.e = 0.0;
    }

    /// Set the first layer height without retracting.
    pub fn set_z(&mut self, z: f64) {
        self.program
            .push(Command::rapid(None, None, Some(z), self.settings.travel_speed));
        self.state.position.z = z;
        self.state.hop_active = false;
    }

    /// Retract, climb to layer height `z`, then prime again.
    pub fn move_to_layer(&mut self, z: f64) {
        self.retract();
        self.set_z(z);
        self.unretract();
    }

    /// Finish the pass and hand back the command stream.
    pub fn finish(self) -> Program {
        self.program
    }
}

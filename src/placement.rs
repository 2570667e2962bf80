use core::time::Duration;

/// A position or scale in scene coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// Unit scale.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }
}

/// Coordinate space positions are applied in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Space {
    /// Scene-global coordinates.
    #[default]
    World,
    /// Coordinates relative to the node's parent.
    Local,
}

/// Where and how an acquired instance is placed.
///
/// A default `Spawn` leaves the instance under its pool container at its
/// current position, in world space, without auto-release.
#[derive(Debug, Clone)]
pub struct Spawn<P> {
    pub(crate) position: Option<Vec3>,
    pub(crate) parent: Option<P>,
    pub(crate) canvas: Option<P>,
    pub(crate) space: Space,
    pub(crate) auto_release: Option<Duration>,
}

impl<P> Default for Spawn<P> {
    fn default() -> Self {
        Spawn {
            position: None,
            parent: None,
            canvas: None,
            space: Space::World,
            auto_release: None,
        }
    }
}

impl<P> Spawn<P> {
    /// Creates a placement with no position, parent or delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Places the instance at `position`, interpreted in the spawn's space.
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    /// Reparents the instance under `parent`.
    pub fn under(mut self, parent: P) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Reparents the instance under the UI canvas of the current world
    /// placement context before any other parent is applied.
    pub fn on_canvas(mut self, canvas: P) -> Self {
        self.canvas = Some(canvas);
        self
    }

    /// Applies position and reparenting in parent-local space.
    pub fn local(mut self) -> Self {
        self.space = Space::Local;
        self
    }

    /// Sets the coordinate space explicitly.
    pub fn in_space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }

    /// Releases the instance back to its pool after `delay`.
    pub fn auto_release(mut self, delay: Duration) -> Self {
        self.auto_release = Some(delay);
        self
    }

    /// The configured coordinate space.
    pub fn space(&self) -> Space {
        self.space
    }

    /// The configured auto-release delay.
    pub fn auto_release_delay(&self) -> Option<Duration> {
        self.auto_release
    }
}

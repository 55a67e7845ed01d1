use glam::{Vec2, Vec3};

/// Thin-lens perspective camera. An aperture of zero degenerates to a
/// pinhole model.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    aperture: f32,
    focal_length: f32,
    focus_distance: f32,
    sensor_size: Vec2,
    depth_range: Vec2,
    aspect_ratio: f32,
    dirty: bool,
}

impl Camera {
    /// Camera at `position` looking at `at`, with `up` as the up hint.
    pub fn look_at(position: Vec3, at: Vec3, up: Vec3) -> Camera {
        let forward = (at - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);
        Camera {
            position,
            forward,
            right,
            up,
            aperture: 0.0,
            focal_length: 0.035,
            focus_distance: 1.0,
            sensor_size: Vec2::new(0.036, 0.024),
            depth_range: Vec2::new(0.0, 100_000.0),
            aspect_ratio: 1.0,
            dirty: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn aperture(&self) -> f32 {
        self.aperture
    }

    pub fn focal_length(&self) -> f32 {
        self.focal_length
    }

    pub fn focus_distance(&self) -> f32 {
        self.focus_distance
    }

    pub fn sensor_size(&self) -> Vec2 {
        self.sensor_size
    }

    pub fn depth_range(&self) -> Vec2 {
        self.depth_range
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn set_aperture(&mut self, aperture: f32) {
        self.aperture = aperture;
        self.dirty = true;
    }

    pub fn set_focal_length(&mut self, focal_length: f32) {
        self.focal_length = focal_length;
        self.dirty = true;
    }

    pub fn set_focus_distance(&mut self, focus_distance: f32) {
        self.focus_distance = focus_distance;
        self.dirty = true;
    }

    pub fn set_sensor_size(&mut self, sensor_size: Vec2) {
        self.sensor_size = sensor_size;
        self.dirty = true;
    }

    pub fn set_depth_range(&mut self, depth_range: Vec2) {
        self.depth_range = depth_range;
        self.dirty = true;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

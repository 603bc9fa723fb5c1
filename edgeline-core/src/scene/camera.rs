use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective { fov_y_deg: f32, near: f32, far: f32 },
    /// `height` is the visible world-space height; width follows the aspect ratio.
    Orthographic { height: f32, near: f32, far: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(40.0, 0.01, 1000.0).looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO)
    }
}

impl Camera {
    pub fn perspective(fov_y_deg: f32, near: f32, far: f32) -> Self {
        Self { eye: Vec3::Z, target: Vec3::ZERO, up: Vec3::Y, projection: Projection::Perspective { fov_y_deg, near, far } }
    }

    pub fn orthographic(height: f32, near: f32, far: f32) -> Self {
        Self { eye: Vec3::Z, target: Vec3::ZERO, up: Vec3::Y, projection: Projection::Orthographic { height, near, far } }
    }

    pub fn looking_at(mut self, eye: Vec3, target: Vec3) -> Self {
        self.eye = eye;
        self.target = target;
        self
    }

    pub fn near(&self) -> f32 {
        match self.projection {
            Projection::Perspective { near, .. } | Projection::Orthographic { near, .. } => near,
        }
    }

    pub fn far(&self) -> f32 {
        match self.projection {
            Projection::Perspective { far, .. } | Projection::Orthographic { far, .. } => far,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        match self.projection {
            Projection::Perspective { fov_y_deg, near, far } => {
                Mat4::perspective_rh(fov_y_deg.to_radians(), aspect, near, far)
            }
            Projection::Orthographic { height, near, far } => {
                let hh = height * 0.5;
                let hw = hh * aspect;
                Mat4::orthographic_rh(-hw, hw, -hh, hh, near, far)
            }
        }
    }
}

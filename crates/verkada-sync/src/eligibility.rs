use common::{cameras::Camera, grants::StreamGrant};

/// Why a camera may be streamed under the current grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Site,
    Camera,
}

/// Site access is checked first; either grant is sufficient.
pub fn eligibility(camera: &Camera, grant: &StreamGrant) -> Option<Eligibility> {
    if camera
        .site_id
        .as_deref()
        .is_some_and(|site| grant.covers_site(site))
    {
        return Some(Eligibility::Site);
    }
    if grant.covers_camera(&camera.camera_id) {
        return Some(Eligibility::Camera);
    }
    None
}

pub fn is_eligible(camera: &Camera, grant: &StreamGrant) -> bool {
    eligibility(camera, grant).is_some()
}

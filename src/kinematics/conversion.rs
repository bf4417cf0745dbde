//! Inverse and forward kinematics between cylindrical targets and joint angles.
//!
//! The rotation joint turns the arm plane toward the target angle. Inside that plane the
//! chain must put its end at `(radius - radius_offset, height - height_offset)`. A link's
//! elevation above horizontal is the sum of the deviations of every chain joint from the
//! base up to it, where a joint at its horizontal angle contributes no deviation.
//!
//! Used by the mechanism to turn a point into a control signal, and back for status.
use core::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use core::ops::{Add, Mul, Sub};

use log::debug;
#[cfg(not(test))]
use micromath::F32Ext;

use crate::config::{MAX_LINKS, REACH_TOLERANCE, SOLVER_MAX_ITERATIONS};
use crate::error::{ArmError, ArmResult};
use crate::kinematics::model::{KinematicModel, Link};
use crate::kinematics::point::CylindricalPoint;
use crate::robot::commands::ControlSignal;

/// Vector in the arm plane: radius along x, height along y.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Planar {
    r: f32,
    h: f32,
}

impl Planar {
    fn polar(length: f32, elevation: f32) -> Self {
        Self {
            r: length * elevation.cos(),
            h: length * elevation.sin(),
        }
    }

    fn length(self) -> f32 {
        (self.r.powi(2) + self.h.powi(2)).sqrt()
    }

    fn elevation(self) -> f32 {
        self.h.atan2(self.r)
    }
}

impl Add for Planar {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            r: self.r + rhs.r,
            h: self.h + rhs.h,
        }
    }
}

impl Sub for Planar {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            r: self.r - rhs.r,
            h: self.h - rhs.h,
        }
    }
}

impl Mul<f32> for Planar {
    type Output = Self;
    fn mul(self, s: f32) -> Self {
        Self {
            r: self.r * s,
            h: self.h * s,
        }
    }
}

/// Translates a cylindrical point into angles for the rotation joint and every chain joint.
///
/// The returned signal holds the rotation joint first, then the chain from the base.
///
/// # Errors
/// * `Unreachable` if the planar target is farther than the stretched chain, closer than
///   the chain can fold, or the iterative solver does not settle on it.
pub fn cylindrical_to_signal(
    model: &KinematicModel,
    point: &CylindricalPoint,
) -> ArmResult<ControlSignal> {
    let mut signal = ControlSignal::new();
    let rotation = &model.rotation;
    signal.push(
        rotation.joint,
        rotation.zero_angle + rotation.sign() * point.angle,
    )?;

    let target = Planar {
        r: point.radius - model.radius_offset,
        h: point.height - model.height_offset,
    };
    let links = model.links();
    let mut elevations = [0.0; MAX_LINKS];
    solve_elevations(links, target, model.reach(), &mut elevations[..links.len()])?;

    let mut previous = 0.0;
    for (link, &elevation) in links.iter().zip(elevations.iter()) {
        let deviation = wrap(elevation - previous) * 180.0 / PI;
        previous = elevation;
        signal.push(
            link.joint,
            link.horizontal_angle + link.direction.sign() * deviation,
        )?;
    }

    debug!("{point:?} -> {signal}");
    Ok(signal)
}

/// Position of the chain end when joint `i` is at `angle_of(i)`.
pub fn forward(model: &KinematicModel, angle_of: impl Fn(usize) -> f32) -> CylindricalPoint {
    let rotation = &model.rotation;
    let angle = rotation.sign() * (angle_of(rotation.joint) - rotation.zero_angle);

    let mut elevation = 0.0;
    let mut end = Planar::default();
    for link in model.links() {
        let deviation = link.direction.sign() * (angle_of(link.joint) - link.horizontal_angle);
        elevation += deviation * PI / 180.0;
        end = end + Planar::polar(link.length, elevation);
    }

    CylindricalPoint {
        radius: end.r + model.radius_offset,
        angle,
        height: end.h + model.height_offset,
    }
}

/// Absolute elevation (radians) of every link putting the chain end on `target`.
fn solve_elevations(
    links: &[Link],
    target: Planar,
    (min_reach, max_reach): (f32, f32),
    elevations: &mut [f32],
) -> ArmResult<()> {
    let distance = target.length();
    let unreachable = ArmError::Unreachable {
        distance,
        min_reach,
        max_reach,
    };
    if distance > max_reach + REACH_TOLERANCE || distance < min_reach - REACH_TOLERANCE {
        return Err(unreachable);
    }

    let bearing = target.elevation();
    if links.len() > 1 && distance >= max_reach - REACH_TOLERANCE {
        // fully stretched toward the target
        elevations.fill(bearing);
        return Ok(());
    }

    match links {
        [] => {}
        [_] => elevations[0] = bearing,
        [upper, lower] => {
            let (shoulder, elbow) = two_link(upper.length, lower.length, target);
            elevations[0] = shoulder;
            elevations[1] = elbow;
        }
        _ => {
            if !fabrik(links, target, elevations) {
                return Err(unreachable);
            }
        }
    }
    Ok(())
}

/// Law of cosines, elbow kept above the line from the base to the target.
fn two_link(upper: f32, lower: f32, target: Planar) -> (f32, f32) {
    let d_squared = target.r.powi(2) + target.h.powi(2);
    let d = d_squared.sqrt();
    if d < f32::EPSILON {
        // equal links folded onto each other: stand the upper one up
        return (FRAC_PI_2, FRAC_PI_2 - PI);
    }

    let shoulder =
        target.elevation() + unit((upper.powi(2) - lower.powi(2) + d_squared) / (2.0 * upper * d)).acos();
    let inner = unit((upper.powi(2) + lower.powi(2) - d_squared) / (2.0 * upper * lower)).acos();
    (shoulder, shoulder - (PI - inner))
}

/// Forward and backward reaching IK in the arm plane. Returns false if the chain end
/// does not settle on the target.
fn fabrik(links: &[Link], target: Planar, elevations: &mut [f32]) -> bool {
    let n = links.len();
    let mut joints = [Planar::default(); MAX_LINKS + 1];

    // start from an arch fanned +-45 degrees around the target bearing
    let bearing = target.elevation();
    for (i, link) in links.iter().enumerate() {
        let spread = (n as f32 - 1.0 - 2.0 * i as f32) / (n as f32 - 1.0);
        joints[i + 1] = joints[i] + Planar::polar(link.length, bearing + FRAC_PI_4 * spread);
    }

    for _ in 0..SOLVER_MAX_ITERATIONS {
        if (joints[n] - target).length() <= REACH_TOLERANCE {
            break;
        }
        joints[n] = target;
        for i in (0..n).rev() {
            joints[i] = place(joints[i + 1], joints[i], links[i].length);
        }
        joints[0] = Planar::default();
        for i in 0..n {
            joints[i + 1] = place(joints[i], joints[i + 1], links[i].length);
        }
    }

    if (joints[n] - target).length() > REACH_TOLERANCE {
        return false;
    }
    for i in 0..n {
        elevations[i] = (joints[i + 1] - joints[i]).elevation();
    }
    true
}

/// Point at `length` from `from`, on the way to `toward`.
fn place(from: Planar, toward: Planar, length: f32) -> Planar {
    let direction = toward - from;
    let norm = direction.length();
    if norm < f32::EPSILON {
        return from + Planar { r: 0.0, h: length };
    }
    from + direction * (length / norm)
}

fn unit(cos: f32) -> f32 {
    cos.max(-1.0).min(1.0)
}

/// Wraps an angle into (-PI, PI].
fn wrap(angle: f32) -> f32 {
    let angle = angle % (2.0 * PI);
    if angle > PI {
        angle - 2.0 * PI
    } else if angle <= -PI {
        angle + 2.0 * PI
    } else {
        angle
    }
}

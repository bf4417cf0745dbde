//! Static geometry of an arm: which joints realize rotation, radius and height.
use core::fmt::Display;

use heapless::Vec;

use crate::config::MAX_LINKS;
use crate::error::{ArmError, ArmResult};

/// Which way a chain joint swings as its angle grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Increasing angle lifts the link from horizontal (+radius) toward vertical (+height).
    Raising,
    Lowering,
}

impl Direction {
    pub fn sign(self) -> f32 {
        match self {
            Direction::Raising => 1.0,
            Direction::Lowering => -1.0,
        }
    }
}

impl From<bool> for Direction {
    fn from(raising: bool) -> Self {
        if raising {
            Direction::Raising
        } else {
            Direction::Lowering
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Direction::Raising => f.write_str("raising"),
            Direction::Lowering => f.write_str("lowering"),
        }
    }
}

/// One rigid segment of the planar chain and the joint at its base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub joint: usize,
    /// Joint angle at which the link lies horizontal, in line with the previous link.
    pub horizontal_angle: f32,
    pub direction: Direction,
    pub length: f32,
}

/// Joint turning the whole arm about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationJoint {
    pub joint: usize,
    /// Joint angle pointing the arm along the positive X axis.
    pub zero_angle: f32,
    pub inverted: bool,
}

impl RotationJoint {
    pub const fn new(joint: usize) -> Self {
        Self {
            joint,
            zero_angle: 0.0,
            inverted: false,
        }
    }

    pub fn sign(&self) -> f32 {
        if self.inverted {
            -1.0
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KinematicModel {
    pub height_offset: f32,
    pub radius_offset: f32,
    pub rotation: RotationJoint,
    links: Vec<Link, MAX_LINKS>,
}

impl KinematicModel {
    pub fn new(height_offset: f32, radius_offset: f32, rotation: RotationJoint) -> Self {
        Self {
            height_offset,
            radius_offset,
            rotation,
            links: Vec::new(),
        }
    }

    /// Builds the model from the per joint description used by the arm firmware, one
    /// slice entry per link from the base outward.
    ///
    /// # Arguments
    /// * `from_base` - joint indices of the chain, base first
    /// * `horizontal_angles` - angle of each joint putting its link horizontal
    /// * `raising` - true if the link moves toward +height as its angle increases
    /// * `lengths` - length of each link
    pub fn from_parallel(
        height_offset: f32,
        radius_offset: f32,
        rotation_joint: usize,
        from_base: &[usize],
        horizontal_angles: &[f32],
        raising: &[bool],
        lengths: &[f32],
    ) -> ArmResult<Self> {
        let joints = from_base.len();
        if horizontal_angles.len() != joints || raising.len() != joints || lengths.len() != joints
        {
            return Err(ArmError::ChainLengthMismatch {
                joints,
                angles: horizontal_angles.len(),
                directions: raising.len(),
                lengths: lengths.len(),
            });
        }

        let mut model = Self::new(
            height_offset,
            radius_offset,
            RotationJoint::new(rotation_joint),
        );
        for i in 0..joints {
            model.push_link(Link {
                joint: from_base[i],
                horizontal_angle: horizontal_angles[i],
                direction: raising[i].into(),
                length: lengths[i],
            })?;
        }
        Ok(model)
    }

    pub fn push_link(&mut self, link: Link) -> ArmResult<()> {
        self.links
            .push(link)
            .map_err(|_| ArmError::AllocationFailure {
                capacity: MAX_LINKS,
            })
    }

    pub fn with_link(mut self, link: Link) -> ArmResult<Self> {
        self.push_link(link)?;
        Ok(self)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Rotation joint first, then the chain from the base.
    pub fn joints(&self) -> impl Iterator<Item = usize> + '_ {
        core::iter::once(self.rotation.joint).chain(self.links.iter().map(|link| link.joint))
    }

    /// Closest and farthest planar distance the chain end can reach from its base.
    pub fn reach(&self) -> (f32, f32) {
        let total: f32 = self.links.iter().map(|link| link.length).sum();
        let longest = self
            .links
            .iter()
            .map(|link| link.length)
            .fold(0.0, f32::max);
        ((2.0 * longest - total).max(0.0), total)
    }
}

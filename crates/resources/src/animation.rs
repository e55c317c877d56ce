//! Keyframed joint animation clips.
//!
//! Time is measured in ticks. A clip plays at `ticks_per_sec` and loops
//! every `duration_ticks`.

use glam::{Mat4, Quat, Vec3};

use crate::error::{ResourceError, ResourceResult};
use crate::skeleton::Skeleton;

/// A value at a point in time, in ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub tick: f32,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub fn new(tick: f32, value: T) -> Self {
        Self { tick, value }
    }
}

/// Keyframe tracks for one joint. Keyframes are sorted by tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JointChannel {
    pub joint: usize,
    pub translations: Vec<Keyframe<Vec3>>,
    pub rotations: Vec<Keyframe<Quat>>,
    pub scales: Vec<Keyframe<Vec3>>,
}

impl JointChannel {
    pub fn new(joint: usize) -> Self {
        Self {
            joint,
            ..Default::default()
        }
    }

    /// Local transform of the joint at `tick`.
    pub fn sample(&self, tick: f32) -> Mat4 {
        let translation = sample_track(&self.translations, tick, Vec3::ZERO, Vec3::lerp);
        let rotation = sample_track(&self.rotations, tick, Quat::IDENTITY, Quat::slerp);
        let scale = sample_track(&self.scales, tick, Vec3::ONE, Vec3::lerp);
        Mat4::from_scale_rotation_translation(scale, rotation, translation)
    }
}

fn sample_track<T: Copy>(
    keys: &[Keyframe<T>],
    tick: f32,
    default: T,
    interpolate: impl Fn(T, T, f32) -> T,
) -> T {
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return default,
    };
    if tick <= first.tick {
        return first.value;
    }
    if tick >= last.tick {
        return last.value;
    }

    // First key strictly after `tick`; exists because tick < last.tick.
    let next = keys.partition_point(|k| k.tick <= tick);
    let (a, b) = (&keys[next - 1], &keys[next]);
    let span = b.tick - a.tick;
    let t = if span > 0.0 { (tick - a.tick) / span } else { 0.0 };
    interpolate(a.value, b.value, t)
}

/// A named animation clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    name: String,
    ticks_per_sec: f32,
    duration_ticks: f32,
    channels: Vec<JointChannel>,
}

impl Animation {
    /// # Errors
    ///
    /// Fails if the tick rate or duration is not positive.
    pub fn new(
        name: impl Into<String>,
        ticks_per_sec: f32,
        duration_ticks: f32,
        channels: Vec<JointChannel>,
    ) -> ResourceResult<Self> {
        let name = name.into();
        if !(ticks_per_sec > 0.0 && duration_ticks > 0.0) {
            return Err(ResourceError::InvalidAnimation(name));
        }
        Ok(Self {
            name,
            ticks_per_sec,
            duration_ticks,
            channels,
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ticks_per_sec(&self) -> f32 {
        self.ticks_per_sec
    }

    #[inline]
    pub fn duration_ticks(&self) -> f32 {
        self.duration_ticks
    }

    #[inline]
    pub fn channels(&self) -> &[JointChannel] {
        &self.channels
    }

    /// Clip-local tick after `secs` seconds of playback, wrapped to the duration.
    pub fn tick_at(&self, secs: f64) -> f32 {
        let ticks = secs * f64::from(self.ticks_per_sec);
        ticks.rem_euclid(f64::from(self.duration_ticks)) as f32
    }

    /// Checks every channel against `skeleton`.
    pub fn validate(&self, skeleton: &Skeleton) -> ResourceResult<()> {
        let joint_count = skeleton.joint_count();
        match self.channels.iter().find(|c| c.joint >= joint_count) {
            Some(channel) => Err(ResourceError::JointOutOfRange {
                context: format!("animation '{}'", self.name),
                joint: channel.joint,
                joint_count,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide() -> JointChannel {
        JointChannel {
            joint: 0,
            translations: vec![
                Keyframe::new(0.0, Vec3::ZERO),
                Keyframe::new(10.0, Vec3::new(10.0, 0.0, 0.0)),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_sample_interpolates_between_keys() {
        let local = slide().sample(2.5);
        assert!(local.w_axis.truncate().abs_diff_eq(Vec3::new(2.5, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_sample_clamps_outside_key_range() {
        let channel = slide();
        assert!(channel.sample(-1.0).w_axis.truncate().abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(channel
            .sample(50.0)
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_empty_channel_is_identity() {
        assert_eq!(JointChannel::new(0).sample(3.0), Mat4::IDENTITY);
    }

    #[test]
    fn test_tick_at_wraps() {
        let clip = Animation::new("walk", 10.0, 20.0, vec![]).unwrap();
        assert!((clip.tick_at(0.5) - 5.0).abs() < 1e-5);
        assert!((clip.tick_at(2.5) - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        assert!(Animation::new("bad", 0.0, 10.0, vec![]).is_err());
        assert!(Animation::new("bad", 24.0, -1.0, vec![]).is_err());
    }

    #[test]
    fn test_validate_against_skeleton() {
        use crate::skeleton::Joint;

        let skeleton = Skeleton::new(vec![Joint::new("root", None, Mat4::IDENTITY)]).unwrap();
        let ok = Animation::new("ok", 24.0, 10.0, vec![JointChannel::new(0)]).unwrap();
        assert!(ok.validate(&skeleton).is_ok());

        let bad = Animation::new("bad", 24.0, 10.0, vec![JointChannel::new(3)]).unwrap();
        assert!(matches!(
            bad.validate(&skeleton),
            Err(ResourceError::JointOutOfRange { joint: 3, joint_count: 1, .. })
        ));
    }
}

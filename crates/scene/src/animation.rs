//! Per-actor animation playback.

use glam::Mat4;
use vesper_resources::{Animation, Skeleton};

/// Which clip an actor plays and the skinning matrices it produced last.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    clip: usize,
    /// Scene time at which the current clip started.
    start_secs: f64,
    speed: f32,
    tick: f32,
    /// One matrix per skeleton joint: global joint transform times inverse bind.
    skinning: Vec<Mat4>,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self {
            clip: 0,
            start_secs: 0.0,
            speed: 1.0,
            tick: 0.0,
            skinning: Vec::new(),
        }
    }
}

impl AnimationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches to clip `index`, restarting it at `now_secs`.
    pub fn select(&mut self, index: usize, now_secs: f64) {
        self.clip = index;
        self.start_secs = now_secs;
        self.tick = 0.0;
    }

    #[inline]
    pub fn clip(&self) -> usize {
        self.clip
    }

    /// Playback rate multiplier; 1.0 is the clip's own rate.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Clip-local tick computed by the last [`update`](Self::update).
    #[inline]
    pub fn tick(&self) -> f32 {
        self.tick
    }

    #[inline]
    pub fn skinning_matrices(&self) -> &[Mat4] {
        &self.skinning
    }

    /// Advances playback to `now_secs` and recomputes the skinning matrices.
    ///
    /// The pose always has one matrix per joint of `skeleton`. If the selected
    /// clip does not exist, the pose is the bind pose (all identity).
    pub fn update(&mut self, animations: &[Animation], skeleton: &Skeleton, now_secs: f64) {
        let joint_count = skeleton.joint_count();
        self.skinning.clear();

        let Some(clip) = animations.get(self.clip) else {
            self.tick = 0.0;
            self.skinning.resize(joint_count, Mat4::IDENTITY);
            return;
        };

        let elapsed = (now_secs - self.start_secs).max(0.0) * f64::from(self.speed);
        self.tick = clip.tick_at(elapsed);

        let mut locals = vec![Mat4::IDENTITY; joint_count];
        for channel in clip.channels() {
            if let Some(local) = locals.get_mut(channel.joint) {
                *local = channel.sample(self.tick);
            }
        }

        // Parents precede children, so globals[parent] is final when read.
        let mut globals: Vec<Mat4> = Vec::with_capacity(joint_count);
        for (joint, local) in skeleton.joints().iter().zip(&locals) {
            let global = match joint.parent {
                Some(parent) => globals[parent] * *local,
                None => *local,
            };
            globals.push(global);
        }

        self.skinning.extend(
            skeleton
                .joints()
                .iter()
                .zip(&globals)
                .map(|(joint, global)| *global * joint.offset),
        );
    }
}

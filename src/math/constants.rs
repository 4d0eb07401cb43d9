/* Copyright 2020 @Yuchen Wong */

pub type Float = f32;
pub type Int = i32;
pub type UInt = u32;

pub type Vector3f = nalgebra::Vector3<Float>;
pub type Vector3i = nalgebra::Vector3<Int>;

pub const EPSILON: Float = 1e-4;

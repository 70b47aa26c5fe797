// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

/// 检测模型
///
/// 模型在多个请求之间共享，`infer` 只读取模型本身，
/// 因此实现必须可以被并发调用。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub score: Option<f32>, // [0, 1]
  pub bbox: [f32; 4],     // [x_min, y_min, x_max, y_max]，像素坐标
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl FromIterator<DetectItem> for DetectResult {
  fn from_iter<I: IntoIterator<Item = DetectItem>>(iter: I) -> Self {
    iter.into_iter().collect::<Vec<_>>().into()
  }
}

#[cfg(feature = "model_rustface")]
mod seeta;
#[cfg(feature = "model_rustface")]
pub use self::seeta::{RustfaceBuilder, RustfaceError, RustfaceModel};

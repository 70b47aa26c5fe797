// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/output.rs - 输出定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;

/// 将检测结果渲染到帧上，产出 `Output`
pub trait Render<F, D> {
  type Output;
  type Error;

  fn render_result(&self, frame: F, result: &D) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("invalid font data: {0}")]
  FontLoadError(#[from] ab_glyph::InvalidFont),
  #[error("failed to encode image: {0}")]
  EncodeError(#[from] image::ImageError),
}

pub mod draw;
mod jpeg;

pub use self::draw::{AnnotationSummary, Draw, FaceCountStatus};
pub use self::jpeg::{DEFAULT_JPEG_QUALITY, JpegOutput, RenderedFrame};

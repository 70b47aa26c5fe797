// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/output/jpeg.rs - JPEG 编码输出
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

use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use tracing::debug;

use crate::{
  model::DetectResult,
  output::{
    OutputError, Render,
    draw::{AnnotationSummary, Draw},
  },
};

pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// 已编码的标注帧
#[derive(Debug, Clone)]
pub struct RenderedFrame {
  pub data: Vec<u8>,
  pub width: u32,
  pub height: u32,
  pub summary: AnnotationSummary,
}

pub struct JpegOutput {
  draw: Draw,
  quality: u8,
}

impl JpegOutput {
  pub fn new(draw: Draw) -> Self {
    Self {
      draw,
      quality: DEFAULT_JPEG_QUALITY,
    }
  }

  /// 质量范围 1-100，超出范围时截断
  pub fn with_quality(mut self, quality: u8) -> Self {
    self.quality = quality.clamp(1, 100);
    self
  }

  pub fn quality(&self) -> u8 {
    self.quality
  }

  fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, OutputError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, self.quality).encode_image(image)?;
    debug!(
      "JPEG 编码完成: {}x{}, {} 字节",
      image.width(),
      image.height(),
      buffer.len()
    );
    Ok(buffer)
  }
}

impl Render<RgbImage, DetectResult> for JpegOutput {
  type Output = RenderedFrame;
  type Error = OutputError;

  fn render_result(
    &self,
    mut frame: RgbImage,
    result: &DetectResult,
  ) -> Result<Self::Output, Self::Error> {
    let summary = self.draw.annotate(&mut frame, result);
    let data = self.encode(&frame)?;
    Ok(RenderedFrame {
      data,
      width: frame.width(),
      height: frame.height(),
      summary,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;
  use crate::output::FaceCountStatus;
  use image::{ImageFormat, Rgb};

  fn output() -> JpegOutput {
    JpegOutput::new(Draw::with_default_font().unwrap())
  }

  #[test]
  fn output_is_jpeg_with_input_dimensions() {
    let frame = RgbImage::from_pixel(333, 217, Rgb([90, 120, 150]));
    let result = DetectResult::from(vec![DetectItem {
      score: Some(0.87),
      bbox: [20.0, 80.0, 120.0, 200.0],
    }]);

    let rendered = output().render_result(frame, &result).unwrap();
    assert_eq!(&rendered.data[..2], &[0xFF, 0xD8]);
    assert_eq!((rendered.width, rendered.height), (333, 217));
    assert_eq!(rendered.summary.status, FaceCountStatus::OneFace);

    let decoded = image::load_from_memory_with_format(&rendered.data, ImageFormat::Jpeg).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (333, 217));
  }

  #[test]
  fn quality_is_clamped() {
    assert_eq!(output().with_quality(0).quality(), 1);
    assert_eq!(output().with_quality(200).quality(), 100);
    assert_eq!(output().quality(), DEFAULT_JPEG_QUALITY);
  }

  #[test]
  fn lower_quality_gives_smaller_output() {
    let mut frame = RgbImage::new(256, 256);
    for (x, y, pixel) in frame.enumerate_pixels_mut() {
      *pixel = Rgb([(x ^ y) as u8, (x * 3) as u8, (y * 7) as u8]);
    }
    let result = DetectResult::default();

    let high = output()
      .with_quality(100)
      .render_result(frame.clone(), &result)
      .unwrap();
    let low = output()
      .with_quality(10)
      .render_result(frame, &result)
      .unwrap();
    assert!(low.data.len() < high.data.len());
  }
}

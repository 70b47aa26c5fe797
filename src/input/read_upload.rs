// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/input/read_upload.rs - 上传数据解码
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

use std::io::Cursor;

use image::{DynamicImage, ImageDecoder, ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("uploaded file is empty")]
  Empty,
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("cannot decode uploaded image: {0}")]
  Decode(image::ImageError),
}

impl From<std::io::Error> for InputError {
  fn from(err: std::io::Error) -> Self {
    InputError::IoError(err)
  }
}

impl From<image::ImageError> for InputError {
  fn from(err: image::ImageError) -> Self {
    InputError::Decode(err)
  }
}

/// 将上传的字节流解码为 RGB 图像
///
/// 图像格式根据内容猜测，解码后按 EXIF 方向信息旋转，
/// 任意颜色类型都会被转换为 3 通道 RGB。
pub fn decode_upload(bytes: &[u8]) -> Result<RgbImage, InputError> {
  if bytes.is_empty() {
    warn!("上传文件为空");
    return Err(InputError::Empty);
  }

  let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
  debug!("猜测的图像格式: {:?}", reader.format());

  let mut decoder = reader.into_decoder()?;
  let orientation = decoder.orientation()?;
  let mut image = DynamicImage::from_decoder(decoder)?;
  image.apply_orientation(orientation);

  debug!(
    "解码完成: {}x{}, 颜色类型 {:?}",
    image.width(),
    image.height(),
    image.color()
  );

  Ok(image.into_rgb8())
}

// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/model/seeta.rs - SeetaFace 人脸检测模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::collections::HashMap;
use std::io::Cursor;
use std::str::FromStr;

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectItem, DetectResult, Model},
};

// SeetaFace 级联分类器不接受小于 20 像素的人脸窗口
const SEETA_MIN_FACE_SIZE_LIMIT: u32 = 20;

const SEETA_DEFAULT_MIN_FACE_SIZE: u32 = 20;
const SEETA_DEFAULT_SCORE_THRESH: f64 = 2.0;
const SEETA_DEFAULT_PYRAMID_SCALE_FACTOR: f32 = 0.8;
const SEETA_DEFAULT_SLIDE_WINDOW_STEP: u32 = 4;

#[derive(Error, Debug)]
pub enum RustfaceError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("参数 {0} 无效: {1}")]
  InvalidParam(&'static str, String),
}

impl From<std::io::Error> for RustfaceError {
  fn from(err: std::io::Error) -> Self {
    RustfaceError::ModelLoadError(err)
  }
}

/// 级联检测参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RustfaceParams {
  pub min_face_size: u32,
  pub score_thresh: f64,
  pub pyramid_scale_factor: f32,
  pub slide_window_step: u32,
}

impl Default for RustfaceParams {
  fn default() -> Self {
    Self {
      min_face_size: SEETA_DEFAULT_MIN_FACE_SIZE,
      score_thresh: SEETA_DEFAULT_SCORE_THRESH,
      pyramid_scale_factor: SEETA_DEFAULT_PYRAMID_SCALE_FACTOR,
      slide_window_step: SEETA_DEFAULT_SLIDE_WINDOW_STEP,
    }
  }
}

impl RustfaceParams {
  fn validate(&self) -> Result<(), RustfaceError> {
    if self.min_face_size < SEETA_MIN_FACE_SIZE_LIMIT {
      return Err(RustfaceError::InvalidParam(
        "min_face_size",
        format!(
          "不能小于 {}, 实际为 {}",
          SEETA_MIN_FACE_SIZE_LIMIT, self.min_face_size
        ),
      ));
    }
    if !self.score_thresh.is_finite() {
      return Err(RustfaceError::InvalidParam(
        "score_thresh",
        format!("必须是有限数值, 实际为 {}", self.score_thresh),
      ));
    }
    if !(self.pyramid_scale_factor > 0.0 && self.pyramid_scale_factor < 1.0) {
      return Err(RustfaceError::InvalidParam(
        "pyramid_scale_factor",
        format!("必须在 (0, 1) 之间, 实际为 {}", self.pyramid_scale_factor),
      ));
    }
    if self.slide_window_step == 0 {
      return Err(RustfaceError::InvalidParam(
        "slide_window_step",
        "必须大于 0".to_string(),
      ));
    }
    Ok(())
  }
}

/// 基于 rustface（SeetaFace 引擎）的人脸检测模型
///
/// 模型只加载一次；rustface 的检测器在检测时需要可变状态，
/// 所以每次推理都从模型的克隆创建独立的检测器，推理可以并发进行。
pub struct RustfaceModel {
  model: rustface::Model,
  params: RustfaceParams,
}

pub struct RustfaceBuilder {
  model_path: String,
  params: RustfaceParams,
}

impl FromUrlWithScheme for RustfaceBuilder {
  const SCHEME: &'static str = "rustface";
}

fn parse_param<T: FromStr>(
  query: &HashMap<String, String>,
  key: &'static str,
  default: T,
) -> Result<T, RustfaceError> {
  match query.get(key) {
    Some(v) => v
      .parse()
      .map_err(|_| RustfaceError::InvalidParam(key, format!("无法解析 '{}'", v))),
    None => Ok(default),
  }
}

impl FromUrl for RustfaceBuilder {
  type Error = RustfaceError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RustfaceError::ModelPathError(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let model_path = url.path().to_string();
    if model_path.is_empty() || model_path == "/" {
      return Err(RustfaceError::ModelPathError("模型路径为空".to_string()));
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();

    let defaults = RustfaceParams::default();
    let params = RustfaceParams {
      min_face_size: parse_param(&query, "min_face_size", defaults.min_face_size)?,
      score_thresh: parse_param(&query, "score_thresh", defaults.score_thresh)?,
      pyramid_scale_factor: parse_param(
        &query,
        "pyramid_scale_factor",
        defaults.pyramid_scale_factor,
      )?,
      slide_window_step: parse_param(&query, "slide_window_step", defaults.slide_window_step)?,
    };
    params.validate()?;

    Ok(RustfaceBuilder { model_path, params })
  }
}

impl RustfaceBuilder {
  pub fn params(&self) -> &RustfaceParams {
    &self.params
  }

  pub fn min_face_size(mut self, size: u32) -> Self {
    self.params.min_face_size = size;
    self
  }

  pub fn score_thresh(mut self, thresh: f64) -> Self {
    self.params.score_thresh = thresh;
    self
  }

  pub fn build(self) -> Result<RustfaceModel, RustfaceError> {
    self.params.validate()?;

    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let model = rustface::read_model(Cursor::new(model_data))
      .map_err(|e| RustfaceError::ModelInvalid(e.to_string()))?;
    info!("模型加载完成, 检测参数: {:?}", self.params);

    Ok(RustfaceModel {
      model,
      params: self.params,
    })
  }
}

/// 将级联分类器的原始得分映射到 [0, 1]
fn score_to_confidence(score: f64) -> f32 {
  (1.0 / (1.0 + (-score).exp())) as f32
}

impl Model for RustfaceModel {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = RustfaceError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let (width, height) = input.dimensions();
    if width < self.params.min_face_size || height < self.params.min_face_size {
      debug!(
        "图像尺寸 {}x{} 小于最小人脸尺寸 {}, 跳过检测",
        width, height, self.params.min_face_size
      );
      return Ok(DetectResult::default());
    }

    let gray = image::imageops::grayscale(input);

    let mut detector = rustface::create_detector_with_model(self.model.clone());
    detector.set_min_face_size(self.params.min_face_size);
    detector.set_score_thresh(self.params.score_thresh);
    detector.set_pyramid_scale_factor(self.params.pyramid_scale_factor);
    detector.set_slide_window_step(self.params.slide_window_step, self.params.slide_window_step);

    let mut image_data = rustface::ImageData::new(gray.as_raw(), width, height);
    let faces = detector.detect(&mut image_data);
    debug!("检测到 {} 张人脸", faces.len());

    Ok(
      faces
        .iter()
        .map(|face| {
          let bbox = face.bbox();
          let x_min = bbox.x() as f32;
          let y_min = bbox.y() as f32;
          DetectItem {
            score: Some(score_to_confidence(face.score())),
            bbox: [
              x_min,
              y_min,
              x_min + bbox.width() as f32,
              y_min + bbox.height() as f32,
            ],
          }
        })
        .collect(),
    )
  }
}

// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/output/draw.rs - 人脸检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{debug, info};

use crate::{
  model::{DetectItem, DetectResult},
  output::OutputError,
};

// 文本渲染常量，坐标均为文本基线位置
const BOX_THICKNESS: i32 = 2;
const LABEL_FONT_SIZE: f32 = 27.0;
const LABEL_BASELINE_OFFSET: i32 = 10; // 置信度标签基线位于边框上方
const STATUS_FONT_SIZE: f32 = 30.0;
const STATUS_BASELINE_Y: i32 = 60;
const TOTAL_FONT_SIZE: f32 = 30.0;
const TOTAL_BASELINE_Y: i32 = 30;
const TOTAL_RIGHT_OFFSET: i32 = 250;

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// 画面中人脸数量对应的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceCountStatus {
  NoFace,
  OneFace,
  MultipleFaces,
}

impl FaceCountStatus {
  pub fn from_count(count: usize) -> Self {
    match count {
      0 => FaceCountStatus::NoFace,
      1 => FaceCountStatus::OneFace,
      _ => FaceCountStatus::MultipleFaces,
    }
  }

  pub fn message(&self) -> &'static str {
    match self {
      FaceCountStatus::NoFace => {
        "No face detected in the view. One face is required for real-time liveness."
      }
      FaceCountStatus::OneFace => "One face detected, real-time liveness prediction in process.",
      FaceCountStatus::MultipleFaces => {
        "Multiple faces in the view. Real-time liveness works on one face only."
      }
    }
  }

  pub fn color(&self) -> Rgb<u8> {
    match self {
      FaceCountStatus::OneFace => GREEN,
      FaceCountStatus::NoFace | FaceCountStatus::MultipleFaces => RED,
    }
  }
}

/// 一次标注的结果概要
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSummary {
  pub faces: usize,
  pub boxes_drawn: usize,
  pub status: FaceCountStatus,
}

impl AnnotationSummary {
  pub fn total_label(&self) -> String {
    total_label(self.faces)
  }
}

pub fn total_label(faces: usize) -> String {
  format!("Total faces: {}", faces)
}

pub fn confidence_label(score: f32) -> String {
  format!("{:.2}", score)
}

pub struct Draw {
  font: FontArc,
  label_scale: PxScale,
  status_scale: PxScale,
  total_scale: PxScale,
}

impl Draw {
  pub fn new(font: FontArc) -> Self {
    Self {
      font,
      label_scale: PxScale::from(LABEL_FONT_SIZE),
      status_scale: PxScale::from(STATUS_FONT_SIZE),
      total_scale: PxScale::from(TOTAL_FONT_SIZE),
    }
  }

  /// 使用内置字体
  pub fn with_default_font() -> Result<Self, OutputError> {
    let font = FontArc::try_from_slice(epaint_default_fonts::HACK_REGULAR)?;
    Ok(Self::new(font))
  }

  pub fn from_font_file(path: impl AsRef<Path>) -> Result<Self, OutputError> {
    let path = path.as_ref();
    info!("加载字体文件: {}", path.display());
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)?;
    Ok(Self::new(font))
  }

  // 将基线坐标换算为文本顶部坐标
  fn top_from_baseline(&self, baseline: i32, scale: PxScale) -> i32 {
    baseline - self.font.as_scaled(scale).ascent().round() as i32
  }

  fn draw_text_at_baseline(
    &self,
    image: &mut RgbImage,
    text: &str,
    x: i32,
    baseline: i32,
    scale: PxScale,
    color: Rgb<u8>,
  ) {
    let y = self.top_from_baseline(baseline, scale);
    draw_text_mut(image, color, x, y, scale, &self.font, text);
  }

  /// 绘制人脸边框及置信度，返回是否绘制了边框
  fn draw_face(&self, image: &mut RgbImage, item: &DetectItem) -> bool {
    let Some(score) = item.score else {
      return false;
    };

    let [x_min, y_min, x_max, y_max] = item.bbox.map(|v| v as i32);
    if x_max < x_min || y_max < y_min {
      debug!("忽略无效边框: {:?}", item.bbox);
      return false;
    }

    // 远超图像范围的坐标收缩到图像边缘之外，避免绘制无意义的长线段
    let (w, h) = (image.width() as i32, image.height() as i32);
    let x_min = x_min.clamp(-BOX_THICKNESS, w + BOX_THICKNESS);
    let y_min = y_min.clamp(-BOX_THICKNESS, h + BOX_THICKNESS);
    let x_max = x_max.clamp(-BOX_THICKNESS, w + BOX_THICKNESS);
    let y_max = y_max.clamp(-BOX_THICKNESS, h + BOX_THICKNESS);

    // 绘制边框（加粗为2像素），超出图像的部分会被裁剪
    for thickness in 0..BOX_THICKNESS {
      let width = x_max - x_min + 1 - 2 * thickness;
      let height = y_max - y_min + 1 - 2 * thickness;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect =
        Rect::at(x_min + thickness, y_min + thickness).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, GREEN);
    }

    self.draw_text_at_baseline(
      image,
      &confidence_label(score),
      x_min,
      y_min - LABEL_BASELINE_OFFSET,
      self.label_scale,
      GREEN,
    );

    true
  }

  fn draw_status(&self, image: &mut RgbImage, status: FaceCountStatus) {
    let text = status.message();
    let (text_width, _) = text_size(self.status_scale, &self.font, text);
    let x = (image.width() as i32 - text_width as i32) / 2;
    self.draw_text_at_baseline(
      image,
      text,
      x,
      STATUS_BASELINE_Y,
      self.status_scale,
      status.color(),
    );
  }

  fn draw_total(&self, image: &mut RgbImage, faces: usize) {
    let x = image.width() as i32 - TOTAL_RIGHT_OFFSET;
    self.draw_text_at_baseline(
      image,
      &total_label(faces),
      x,
      TOTAL_BASELINE_Y,
      self.total_scale,
      WHITE,
    );
  }

  /// 在图像上原地绘制检测结果、状态提示和人脸总数
  pub fn annotate(&self, image: &mut RgbImage, result: &DetectResult) -> AnnotationSummary {
    let boxes_drawn = result
      .items
      .iter()
      .filter(|item| self.draw_face(image, item))
      .count();

    let faces = result.len();
    let status = FaceCountStatus::from_count(faces);
    self.draw_status(image, status);
    self.draw_total(image, faces);

    AnnotationSummary {
      faces,
      boxes_drawn,
      status,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

  fn face(score: Option<f32>, bbox: [f32; 4]) -> DetectItem {
    DetectItem { score, bbox }
  }

  fn any_pixel_in_rows(
    image: &RgbImage,
    rows: std::ops::Range<u32>,
    f: impl Fn(&Rgb<u8>) -> bool,
  ) -> bool {
    rows
      .filter(|y| *y < image.height())
      .any(|y| (0..image.width()).any(|x| f(image.get_pixel(x, y))))
  }

  fn is_white(p: &Rgb<u8>) -> bool {
    p[0] > 200 && p[1] > 200 && p[2] > 200
  }

  // 总数文本只出现在右上角，且位于状态文本上方
  fn assert_total_in_top_right(image: &RgbImage) {
    let left_edge = image.width() - TOTAL_RIGHT_OFFSET as u32;
    let white_at = |x_range: std::ops::Range<u32>| {
      (0..35).any(|y| x_range.clone().any(|x| is_white(image.get_pixel(x, y))))
    };
    assert!(white_at(left_edge..image.width()));
    assert!(!white_at(0..left_edge));
  }

  #[test]
  fn status_follows_face_count() {
    assert_eq!(FaceCountStatus::from_count(0), FaceCountStatus::NoFace);
    assert_eq!(FaceCountStatus::from_count(1), FaceCountStatus::OneFace);
    assert_eq!(FaceCountStatus::from_count(2), FaceCountStatus::MultipleFaces);
    assert_eq!(FaceCountStatus::from_count(17), FaceCountStatus::MultipleFaces);

    assert!(FaceCountStatus::NoFace.message().starts_with("No face detected"));
    assert!(FaceCountStatus::OneFace.message().starts_with("One face detected"));
    assert!(FaceCountStatus::MultipleFaces.message().starts_with("Multiple faces"));
  }

  #[test]
  fn labels_use_two_decimals() {
    assert_eq!(confidence_label(0.9987), "1.00");
    assert_eq!(confidence_label(0.5), "0.50");
    assert_eq!(confidence_label(0.123), "0.12");
    assert_eq!(total_label(3), "Total faces: 3");
  }

  #[test]
  fn no_face_summary() {
    let draw = Draw::with_default_font().unwrap();
    let mut image = RgbImage::new(640, 480);
    let summary = draw.annotate(&mut image, &DetectResult::default());

    assert_eq!(summary.faces, 0);
    assert_eq!(summary.boxes_drawn, 0);
    assert_eq!(summary.status, FaceCountStatus::NoFace);
    assert_eq!(summary.total_label(), "Total faces: 0");
    // 红色状态文本
    assert!(any_pixel_in_rows(&image, 32..70, |p| p[0] > 200 && p[1] < 60 && p[2] < 60));
    assert_total_in_top_right(&image);
  }

  #[test]
  fn one_face_draws_one_box() {
    let draw = Draw::with_default_font().unwrap();
    let mut image = RgbImage::new(640, 480);
    let result = DetectResult::from(vec![face(Some(0.93), [100.0, 200.0, 220.0, 360.0])]);
    let summary = draw.annotate(&mut image, &result);

    assert_eq!(summary.faces, 1);
    assert_eq!(summary.boxes_drawn, 1);
    assert_eq!(summary.status, FaceCountStatus::OneFace);

    // 2 像素宽的左边框
    assert_eq!(image.get_pixel(100, 280), &GREEN);
    assert_eq!(image.get_pixel(101, 280), &GREEN);
    assert_eq!(image.get_pixel(102, 280), &BLACK);
    // 右边框与下边框
    assert_eq!(image.get_pixel(220, 280), &GREEN);
    assert_eq!(image.get_pixel(160, 360), &GREEN);
    // 框内不被填充
    assert_eq!(image.get_pixel(160, 280), &BLACK);
    // 绿色状态文本
    assert!(any_pixel_in_rows(&image, 32..70, |p| p[1] > 200 && p[0] < 60 && p[2] < 60));
  }

  #[test]
  fn multiple_faces_draw_every_box() {
    let draw = Draw::with_default_font().unwrap();
    let mut image = RgbImage::new(640, 480);
    let result = DetectResult::from(vec![
      face(Some(0.91), [40.0, 150.0, 140.0, 280.0]),
      face(Some(0.75), [300.0, 160.0, 400.0, 300.0]),
      face(Some(0.55), [480.0, 170.0, 600.0, 320.0]),
    ]);
    let summary = draw.annotate(&mut image, &result);

    assert_eq!(summary.faces, 3);
    assert_eq!(summary.boxes_drawn, 3);
    assert_eq!(summary.status, FaceCountStatus::MultipleFaces);
    assert_eq!(summary.total_label(), "Total faces: 3");
    assert_eq!(image.get_pixel(40, 200), &GREEN);
    assert_eq!(image.get_pixel(300, 200), &GREEN);
    assert_eq!(image.get_pixel(480, 200), &GREEN);
    assert_total_in_top_right(&image);
  }

  #[test]
  fn face_without_confidence_is_counted_but_not_drawn() {
    let draw = Draw::with_default_font().unwrap();
    let mut image = RgbImage::new(640, 480);
    let result = DetectResult::from(vec![face(None, [100.0, 200.0, 220.0, 360.0])]);
    let summary = draw.annotate(&mut image, &result);

    assert_eq!(summary.faces, 1);
    assert_eq!(summary.boxes_drawn, 0);
    assert_eq!(summary.status, FaceCountStatus::OneFace);
    assert_eq!(image.get_pixel(100, 280), &BLACK);
  }

  #[test]
  fn boxes_outside_the_frame_are_clipped() {
    let draw = Draw::with_default_font().unwrap();
    let mut image = RgbImage::new(120, 90);
    let result = DetectResult::from(vec![
      face(Some(0.8), [-50.0, -40.0, 60.0, 85.0]),
      face(Some(0.8), [100.0, 80.0, 900.0, 700.0]),
      face(Some(0.8), [5000.0, 5000.0, 5100.0, 5100.0]),
      face(Some(0.8), [30.0, 30.0, 10.0, 10.0]),
    ]);
    let summary = draw.annotate(&mut image, &result);

    assert_eq!(image.dimensions(), (120, 90));
    assert_eq!(summary.faces, 4);
    assert_eq!(summary.boxes_drawn, 3);
    assert_eq!(image.get_pixel(60, 80), &GREEN);
  }

  #[test]
  fn tiny_frame_does_not_panic() {
    let draw = Draw::with_default_font().unwrap();
    let mut image = RgbImage::new(1, 1);
    let result = DetectResult::from(vec![face(Some(0.99), [0.0, 0.0, 0.0, 0.0])]);
    let summary = draw.annotate(&mut image, &result);
    assert_eq!(summary.boxes_drawn, 1);
  }

  #[test]
  fn invalid_font_file_is_an_error() {
    let dir = std::env::temp_dir().join("liveface-draw-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.ttf");
    std::fs::write(&path, b"not a font").unwrap();

    assert!(matches!(
      Draw::from_font_file(&path),
      Err(OutputError::FontLoadError(_))
    ));
    assert!(matches!(
      Draw::from_font_file(dir.join("missing.ttf")),
      Err(OutputError::IoError(_))
    ));
  }
}

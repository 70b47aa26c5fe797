// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/task.rs - 单次检测任务
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
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  input::{InputError, decode_upload},
  model::{DetectResult, Model},
  output::Render,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum TaskError {
  #[error(transparent)]
  Input(#[from] InputError),
  #[error("face detection failed: {0}")]
  Inference(#[source] BoxError),
  #[error("failed to render result: {0}")]
  Render(#[source] BoxError),
}

impl TaskError {
  /// 是否由客户端上传的数据导致
  pub fn is_client_error(&self) -> bool {
    matches!(self, TaskError::Input(_))
  }
}

/// 对一份上传数据执行 解码 → 推理 → 渲染
pub struct OneShotTask;

impl OneShotTask {
  pub fn run<M, O>(&self, upload: &[u8], model: &M, output: &O) -> Result<O::Output, TaskError>
  where
    M: Model<Input = RgbImage, Output = DetectResult>,
    M::Error: std::error::Error + Send + Sync + 'static,
    O: Render<RgbImage, DetectResult>,
    O::Error: std::error::Error + Send + Sync + 'static,
  {
    let now = std::time::Instant::now();
    let frame = decode_upload(upload)?;
    debug!(
      "解码完成: {}x{}, 耗时: {:.2?}",
      frame.width(),
      frame.height(),
      now.elapsed()
    );

    let infer_start = std::time::Instant::now();
    let result = model.infer(&frame).map_err(|e| {
      error!("推理失败: {}", e);
      TaskError::Inference(Box::new(e))
    })?;
    info!(
      "推理完成，检测到 {} 张人脸，耗时: {:.2?}",
      result.len(),
      infer_start.elapsed()
    );

    let output = output.render_result(frame, &result).map_err(|e| {
      error!("渲染失败: {}", e);
      TaskError::Render(Box::new(e))
    })?;
    debug!("任务完成，总耗时: {:.2?}", now.elapsed());

    Ok(output)
  }
}

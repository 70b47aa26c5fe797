// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/server.rs - HTTP 检测服务
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

use std::sync::Arc;

use axum::{
  Json, Router,
  body::Bytes,
  extract::{
    DefaultBodyLimit, Multipart, State,
    multipart::{MultipartError, MultipartRejection},
  },
  http::{StatusCode, header},
  response::{IntoResponse, Response},
  routing::post,
};
use image::RgbImage;
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::{
  model::{DetectResult, Model},
  output::JpegOutput,
  task::{OneShotTask, TaskError},
};

/// 上传文件所在的表单字段
pub const UPLOAD_FIELD: &str = "file";

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("missing upload field '{0}'")]
  MissingFile(&'static str),
  #[error("invalid multipart body: {0}")]
  Multipart(#[from] MultipartError),
  #[error("expected a multipart/form-data upload: {0}")]
  NotMultipart(#[from] MultipartRejection),
  #[error(transparent)]
  Task(#[from] TaskError),
  #[error("detection worker failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::MissingFile(_) => StatusCode::UNPROCESSABLE_ENTITY,
      ApiError::Multipart(e) => e.status(),
      ApiError::NotMultipart(e) => e.status(),
      ApiError::Task(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
      ApiError::Task(_) | ApiError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!("请求处理失败: {}", self);
    } else {
      warn!("请求被拒绝 ({}): {}", status, self);
    }
    (status, Json(json!({ "detail": self.to_string() }))).into_response()
  }
}

/// 请求间共享的模型与输出
pub struct AppState<M> {
  model: Arc<M>,
  output: Arc<JpegOutput>,
}

impl<M> Clone for AppState<M> {
  fn clone(&self) -> Self {
    Self {
      model: Arc::clone(&self.model),
      output: Arc::clone(&self.output),
    }
  }
}

impl<M> AppState<M> {
  pub fn new(model: M, output: JpegOutput) -> Self {
    Self {
      model: Arc::new(model),
      output: Arc::new(output),
    }
  }
}

pub fn router<M>(state: AppState<M>, max_upload_bytes: usize) -> Router
where
  M: Model<Input = RgbImage, Output = DetectResult> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route("/detect/", post(detect::<M>))
    .route("/detect", post(detect::<M>))
    .layer(DefaultBodyLimit::max(max_upload_bytes))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// 优先使用名为 `file` 的字段，否则退回到第一个带文件名的字段
async fn read_upload(mut multipart: Multipart) -> Result<Bytes, ApiError> {
  let mut fallback = None;
  while let Some(field) = multipart.next_field().await? {
    if field.name() == Some(UPLOAD_FIELD) {
      return Ok(field.bytes().await?);
    }
    if fallback.is_none() && field.file_name().is_some() {
      fallback = Some(field.bytes().await?);
    }
  }
  fallback.ok_or(ApiError::MissingFile(UPLOAD_FIELD))
}

async fn detect<M>(
  State(state): State<AppState<M>>,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError>
where
  M: Model<Input = RgbImage, Output = DetectResult> + Send + Sync + 'static,
  M::Error: std::error::Error + Send + Sync + 'static,
{
  let upload = read_upload(multipart?).await?;
  info!("收到上传文件: {} 字节", upload.len());

  let rendered = tokio::task::spawn_blocking(move || {
    OneShotTask.run(&upload, state.model.as_ref(), state.output.as_ref())
  })
  .await??;

  info!(
    "返回标注图像: {}x{}, {} ({} 个边框)",
    rendered.width,
    rendered.height,
    rendered.summary.total_label(),
    rendered.summary.boxes_drawn
  );

  Ok(([(header::CONTENT_TYPE, "image/jpeg")], rendered.data).into_response())
}

/// 等待 Ctrl-C 或 SIGTERM
pub async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!("无法监听 Ctrl-C 信号: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        error!("无法监听 SIGTERM 信号: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }

  info!("收到中断信号，等待进行中的请求完成后退出...");
}

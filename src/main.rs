// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use liveface::{
  FromUrl,
  model::RustfaceBuilder,
  output::{Draw, JpegOutput},
  server::{self, AppState},
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = args::Args::parse();

  info!("Liveface 人脸检测服务");
  info!("模型: {}", args.model);
  info!("JPEG 质量: {}", args.jpeg_quality);
  info!("上传大小上限: {} 字节", args.max_upload_bytes);

  info!("正在加载模型...");
  let model = RustfaceBuilder::from_url(&args.model)?.build()?;

  let draw = match &args.font {
    Some(path) => Draw::from_font_file(path)?,
    None => Draw::with_default_font()?,
  };
  let output = JpegOutput::new(draw).with_quality(args.jpeg_quality);

  let app = server::router(AppState::new(model, output), args.max_upload_bytes);

  let addr = SocketAddr::new(args.host, args.port);
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!("服务已启动: http://{}/detect/", listener.local_addr()?);

  axum::serve(listener, app)
    .with_graceful_shutdown(server::shutdown_signal())
    .await?;

  info!("服务已退出");
  Ok(())
}

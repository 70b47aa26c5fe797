// 该文件是 Liveface （活体人脸） 项目的一部分。
// src/args.rs - 项目参数配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use url::Url;

use liveface::{output::DEFAULT_JPEG_QUALITY, server::DEFAULT_MAX_UPLOAD_BYTES};

/// Liveface 人脸检测服务参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 监听地址
  #[arg(long, default_value = "0.0.0.0", value_name = "HOST")]
  pub host: IpAddr,

  /// 监听端口
  #[arg(long, default_value_t = 8000, value_name = "PORT")]
  pub port: u16,

  /// 人脸检测模型
  /// 例如: rustface:///path/to/seeta_fd_frontal_v1.0.bin?min_face_size=20&score_thresh=2.0
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 标注文字使用的 TTF/OTF 字体文件，缺省时使用内置字体
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// JPEG 编码质量 (1 - 100)
  #[arg(
    long,
    default_value_t = DEFAULT_JPEG_QUALITY,
    value_parser = clap::value_parser!(u8).range(1..=100),
    value_name = "QUALITY"
  )]
  pub jpeg_quality: u8,

  /// 上传文件大小上限（字节）
  #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, value_name = "BYTES")]
  pub max_upload_bytes: usize,
}

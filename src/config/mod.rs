// ABOUTME: Configuration module for deployment-specific settings
// ABOUTME: Environment-variable driven, no config files beyond optional .env
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 ShopVerse

/// Environment configuration management
pub mod environment;

/* Copyright 2025 The NeoShell Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Rendering and parsing of row streams for `neoshell`. Rows described by [`Columns`] are
//! written through a [`Sink`] by the encoders in [`encoder`] using the settings in a
//! [`RenderContext`], and are read back from CSV or JSON by the decoders in [`decoder`].
//!
//! [`Columns`]: crate::schema::Columns
//! [`Sink`]: crate::sink::Sink
//! [`RenderContext`]: crate::context::RenderContext

pub mod compression;
pub mod context;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod fields;
pub mod format;
pub mod schema;
pub mod sink;
pub mod timeformat;
pub mod zone;

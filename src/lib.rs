pub mod cli;
mod core;
pub mod packager;
mod processors;
pub mod session;
mod utils;

pub use crate::core::{
    Batch, BatchStats, Configuration, ConversionResult, ConvertError, ConvertedImage,
    EngineSettings, ErrorKind, ImageConverter, OutputFormat, RawFile, ResizeAlgorithm, Result,
    MAX_ALLOC_BYTES, MAX_DIMENSION,
};
pub use packager::{
    deliver_all, deliver_one, package_many, package_one, Artifact, ArtifactSink, DirectorySink,
};
pub use processors::{orientation, BatchConverter, CancelToken, Decoder, Encoder, Resizer};
pub use session::Session;
pub use utils::{
    converted_filename, file_stem, format_file_size, is_accepted_file, media_type_for_path,
    sanitize_filename, unique_path, ACCEPTED_EXTENSIONS,
};

pub mod prelude {
    pub use crate::{
        deliver_all, package_many, package_one, ArtifactSink, BatchConverter, CancelToken,
        Configuration, EngineSettings, OutputFormat, RawFile, Session,
    };
}

// Re-export commonly used types
pub use image::DynamicImage;

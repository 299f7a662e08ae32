//! MP4 `ilst` tag writer
//!
//! Writes a [`TagSet`] into the iTunes style metadata list of MP4 containers
//! using `lofty`. Items not covered by the tag set are preserved.

use super::{TagSet, TagWriteError, TagWriter};
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::mp4::{Atom, AtomData, AtomIdent, DataType, Ilst, Mp4File};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::TagExt;
use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

/// Container extensions whose `ilst` can be written
const MP4_EXTENSIONS: &[&str] = &["mp4", "m4v"];

/// Data type of the one byte media kind
const BE_SIGNED_INTEGER: DataType = DataType::BeSignedInteger;

/// Implicit data type used by the track and disk tuples
const IMPLICIT: DataType = DataType::Reserved;

const TITLE: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9nam");
const SHOW_NAME: AtomIdent<'static> = AtomIdent::Fourcc(*b"tvsh");
const ALBUM: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9alb");
const SEASON_NUMBER: AtomIdent<'static> = AtomIdent::Fourcc(*b"tvsn");
const EPISODE_NUMBER: AtomIdent<'static> = AtomIdent::Fourcc(*b"tves");
const TRACK_NUMBER: AtomIdent<'static> = AtomIdent::Fourcc(*b"trkn");
const DISK_NUMBER: AtomIdent<'static> = AtomIdent::Fourcc(*b"disk");
const MEDIA_KIND: AtomIdent<'static> = AtomIdent::Fourcc(*b"stik");
const CONTENT_RATING: AtomIdent<'static> = AtomIdent::Fourcc(*b"rtng");
const GENRE: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9gen");
const RELEASE_DATE: AtomIdent<'static> = AtomIdent::Fourcc(*b"\xa9day");
const SHORT_DESCRIPTION: AtomIdent<'static> = AtomIdent::Fourcc(*b"desc");
const LONG_DESCRIPTION: AtomIdent<'static> = AtomIdent::Fourcc(*b"ldes");
const COVER: AtomIdent<'static> = AtomIdent::Fourcc(*b"covr");

fn language_ident() -> AtomIdent<'static> {
    AtomIdent::Freeform {
        mean: Cow::Borrowed("com.apple.iTunes"),
        name: Cow::Borrowed("LANGUAGE"),
    }
}

/// Tag writer for MP4 family containers
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp4TagWriter;

impl Mp4TagWriter {
    pub fn new() -> Self {
        Self
    }

    fn is_mp4_container(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| MP4_EXTENSIONS.iter().any(|m| m.eq_ignore_ascii_case(ext)))
    }
}

impl TagWriter for Mp4TagWriter {
    fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), TagWriteError> {
        if !Self::is_mp4_container(path) {
            return Err(TagWriteError::UnsupportedContainer(path.to_path_buf()));
        }

        let codec_error = |e: lofty::error::LoftyError| TagWriteError::Codec {
            path: path.to_path_buf(),
            message: e.to_string(),
        };

        let mp4 = {
            let mut file = File::open(path).map_err(|e| TagWriteError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
            // Audio properties are not needed and fail on video-only files
            Mp4File::read_from(&mut file, ParseOptions::new().read_properties(false))
                .map_err(codec_error)?
        };

        let mut ilst = mp4.ilst().cloned().unwrap_or_default();
        apply_tag_set(&mut ilst, tags);

        ilst.save_to_path(path, WriteOptions::default())
            .map_err(codec_error)?;

        tracing::debug!(path = %path.display(), "saved ilst");
        Ok(())
    }
}

/// Replaces every item of `ilst` the tag set has a value for
pub(super) fn apply_tag_set(ilst: &mut Ilst, tags: &TagSet) {
    if let Some(title) = &tags.title {
        replace_text(ilst, TITLE, title);
    }
    replace_text(ilst, SHOW_NAME, &tags.show_name);
    replace_text(ilst, ALBUM, &tags.album);

    if let Some(season) = tags.season_number {
        replace_integer(ilst, SEASON_NUMBER, season);
    }
    if let Some(episode) = tags.episode_number {
        replace_integer(ilst, EPISODE_NUMBER, episode);
    }
    if let Some((number, total)) = tags.track_number {
        let [n_hi, n_lo] = number.to_be_bytes();
        let [t_hi, t_lo] = total.to_be_bytes();
        replace_raw(ilst, TRACK_NUMBER, IMPLICIT, vec![0, 0, n_hi, n_lo, t_hi, t_lo, 0, 0]);
    }
    if let Some((number, total)) = tags.disk_number {
        let [n_hi, n_lo] = number.to_be_bytes();
        let [t_hi, t_lo] = total.to_be_bytes();
        replace_raw(ilst, DISK_NUMBER, IMPLICIT, vec![0, 0, n_hi, n_lo, t_hi, t_lo]);
    }

    replace_raw(ilst, MEDIA_KIND, BE_SIGNED_INTEGER, vec![tags.media_kind.code()]);

    if let Some(rating) = tags.content_rating {
        replace_integer(ilst, CONTENT_RATING, rating);
    }
    if let Some(genre) = &tags.genre {
        replace_text(ilst, GENRE, genre);
    }
    if let Some(date) = &tags.release_date {
        replace_text(ilst, RELEASE_DATE, date);
    }
    if let Some(description) = &tags.short_description {
        replace_text(ilst, SHORT_DESCRIPTION, description);
    }
    if let Some(description) = &tags.long_description {
        replace_text(ilst, LONG_DESCRIPTION, description);
    }
    if let Some(language) = &tags.language {
        replace_text(ilst, language_ident(), language);
    }
    if let Some(artwork) = &tags.artwork {
        let picture = Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::from_str(&artwork.mime_type)),
            None,
            artwork.data.clone(),
        );
        ilst.replace_atom(Atom::new(COVER, AtomData::Picture(picture)));
    }
}

fn replace_text(ilst: &mut Ilst, ident: AtomIdent<'static>, value: &str) {
    ilst.replace_atom(Atom::new(ident, AtomData::UTF8(value.to_string())));
}

fn replace_integer(ilst: &mut Ilst, ident: AtomIdent<'static>, value: u32) {
    // Mapped numbers are already limited to the signed 32 bit range
    let value = i32::try_from(value).unwrap_or(i32::MAX);
    ilst.replace_atom(Atom::new(ident, AtomData::SignedInteger(value)));
}

fn replace_raw(ilst: &mut Ilst, ident: AtomIdent<'static>, code: DataType, data: Vec<u8>) {
    ilst.replace_atom(Atom::new(ident, AtomData::Unknown { code, data }));
}

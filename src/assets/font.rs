use std::{path::Path, sync::Arc};

use anyhow::Context;

use crate::{
    config::{FONT_ENV_VAR, FontConfig, FontSlot, FontWeight},
    foundation::error::{CapResult, CapstackError},
};

/// Families tried first for system lookups; captions are frequently CJK.
const PREFERRED_FAMILIES: &[&str] = &[
    "Noto Sans CJK SC",
    "Noto Sans SC",
    "Source Han Sans SC",
    "PingFang SC",
    "Microsoft YaHei",
    "WenQuanYi Micro Hei",
];

/// Font bytes chosen for one caption slot.
#[derive(Clone)]
pub(crate) struct ResolvedFont {
    pub(crate) bytes: Arc<Vec<u8>>,
    /// Family name to request from the layout engine, when known up front.
    pub(crate) family: Option<String>,
    /// Human-readable origin for logs and errors.
    pub(crate) origin: String,
}

impl std::fmt::Debug for ResolvedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFont")
            .field("bytes_len", &self.bytes.len())
            .field("family", &self.family)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Resolves caption fonts: explicit path, then `CAPSTACK_FONT`, then the system font database.
///
/// The system database is only scanned on first use.
#[derive(Default)]
pub(crate) struct FontResolver {
    system: Option<usvg::fontdb::Database>,
}

impl FontResolver {
    pub(crate) fn resolve(
        &mut self,
        config: &FontConfig,
        slot: FontSlot,
        weight: FontWeight,
    ) -> CapResult<ResolvedFont> {
        if let Some(path) = config.path_for(slot) {
            return read_font_file(path);
        }
        if let Some(path) = std::env::var_os(FONT_ENV_VAR).filter(|v| !v.is_empty()) {
            return read_font_file(Path::new(&path));
        }
        self.query_system(weight).ok_or_else(|| {
            CapstackError::render(format!(
                "no font available for {slot:?} captions; set {FONT_ENV_VAR} or configure a font path"
            ))
        })
    }

    fn query_system(&mut self, weight: FontWeight) -> Option<ResolvedFont> {
        use usvg::fontdb;

        let db = self.system.get_or_insert_with(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "loaded system font database");
            db
        });

        let mut families: Vec<fontdb::Family<'_>> = PREFERRED_FAMILIES
            .iter()
            .map(|&name| fontdb::Family::Name(name))
            .collect();
        families.push(fontdb::Family::SansSerif);

        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight(weight.css_value()),
            stretch: fontdb::Stretch::Normal,
            style: fontdb::Style::Normal,
        };
        let id = db.query(&query).or_else(|| db.faces().next().map(|f| f.id))?;
        let face = db.face(id)?;
        let family = face.families.first().map(|(name, _)| name.clone());
        let origin = match &face.source {
            fontdb::Source::File(p) | fontdb::Source::SharedFile(p, _) => {
                p.display().to_string()
            }
            fontdb::Source::Binary(_) => "<system binary font>".to_string(),
        };
        let bytes = db.with_face_data(id, |data, _index| data.to_vec())?;
        tracing::debug!(%origin, ?family, "resolved system caption font");
        Some(ResolvedFont {
            bytes: Arc::new(bytes),
            family,
            origin,
        })
    }
}

fn read_font_file(path: &Path) -> CapResult<ResolvedFont> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("read font file '{}'", path.display()))
        .map_err(CapstackError::render_from)?;
    Ok(ResolvedFont {
        bytes: Arc::new(bytes),
        family: None,
        origin: path.display().to_string(),
    })
}

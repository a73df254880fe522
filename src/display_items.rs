//! Builds display items (storefront presentation of each bundled title)
//! from the display item sheet.

use tracing::{debug, warn};

use crate::error::{Result, SotbError};
use crate::literal::Literal;
use crate::records::DisplayItemRow;

/// Override key used when a title is shown in the bundle itself.
pub const DEFAULT_OVERRIDE: &str = "bundle";

/// Struct key holding the title's base fields; never an override.
const BASE_STRUCT: &str = "default";

type DrmTable = &'static [(&'static str, &'static [&'static str])];
type PlatformTable = &'static [(&'static str, DrmTable)];

/// device -> drm -> platforms that drm can deliver on.
const PLATFORM_ICONS: PlatformTable = &[
    (
        "game",
        &[
            ("steam", &["windows", "mac", "linux"]),
            ("download", &["windows", "mac", "linux"]),
            ("other-key", &["windows", "mac", "linux"]),
            ("uplay", &["windows", "mac", "linux"]),
            ("origin", &["windows", "mac", "linux"]),
            ("wiiu", &["wiiu"]),
            ("3DS", &["3DS"]),
            ("ps3", &["ps3"]),
            ("ps4", &["ps4"]),
            ("xboxone", &["xboxone"]),
        ],
    ),
    ("mobile", &[("android", &["android"]), ("iOS", &["iOS"])]),
    (
        "video",
        &[("rifftrax", &["rifftrax"]), ("video-download", &["hd", "sd"])],
    ),
    (
        "music",
        &[
            ("rifftrax", &["rifftrax"]),
            ("audio-download", &["mp3", "flac", "ogg", "wav"]),
        ],
    ),
];

struct ItemContext<'a> {
    row: &'a DisplayItemRow,
    machine_name: &'a str,
    override_key: &'a str,
}

impl<'a> ItemContext<'a> {
    /// `_<override>` for titles that were shown in an earlier bundle.
    fn suffix(&self) -> String {
        if self.override_key == DEFAULT_OVERRIDE {
            String::new()
        } else {
            format!("_{}", self.override_key)
        }
    }

    fn device_drms(&self) -> Result<Vec<(&'a str, DrmTable)>> {
        self.row
            .device
            .iter()
            .map(|device| {
                PLATFORM_ICONS
                    .iter()
                    .find(|(name, _)| name == device)
                    .map(|(_, drms)| (device.as_str(), *drms))
                    .ok_or_else(|| {
                        SotbError::row(self.row.line, format!("unknown device '{device}'"))
                    })
            })
            .collect()
    }
}

/// One field of the override struct: emitted when `applies` holds, with
/// its value from `compute` (`None` meaning nothing worth emitting).
struct FieldRule {
    applies: fn(&ItemContext) -> bool,
    field: &'static str,
    compute: fn(&ItemContext) -> Result<Option<Literal>>,
}

/// Evaluated in this order; the output keeps it.
const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        applies: |_| true,
        field: "box-art-human-name",
        compute: |cx| Ok(Some(Literal::Str(text(&cx.row.human_name)))),
    },
    FieldRule {
        applies: |_| true,
        field: "front-page-art",
        compute: |cx| {
            Ok(Some(Literal::Str(format!(
                "images/displayitems/{}{}.png",
                cx.machine_name,
                cx.suffix()
            ))))
        },
    },
    FieldRule {
        applies: |cx| cx.row.slideout_image,
        field: "preview-image",
        compute: |cx| {
            Ok(Some(Literal::Str(format!(
                "images/popups/{}_slideout.jpg",
                cx.machine_name
            ))))
        },
    },
    FieldRule {
        applies: |cx| cx.row.background_image,
        field: "slideshow-background",
        compute: |cx| {
            Ok(Some(Literal::Str(format!(
                "images/bg/{}{}_background.jpg",
                cx.machine_name,
                cx.suffix()
            ))))
        },
    },
    FieldRule {
        applies: |cx| cx.row.pdf_preview,
        field: "image_extra",
        compute: |cx| {
            let overlay = Literal::map().entry("type", Literal::str("PDF")).build();
            Ok(Some(
                Literal::map()
                    .entry(
                        "link",
                        Literal::Str(format!("ops/pdfs/{}_preview.pdf", cx.machine_name)),
                    )
                    .entry("overlay", overlay)
                    .build(),
            ))
        },
    },
    FieldRule {
        applies: |cx| cx.row.description.is_some(),
        field: "description-text",
        compute: |cx| Ok(cx.row.description.as_deref().map(|d| Literal::Str(text(d)))),
    },
    FieldRule {
        applies: |cx| !cx.row.device.is_empty(),
        field: "content",
        compute: platform_content,
    },
    FieldRule {
        applies: |cx| !cx.row.device.is_empty(),
        field: "unavailable-platforms",
        compute: unavailable_platforms,
    },
    FieldRule {
        applies: |cx| cx.row.developer_name.is_some(),
        field: "developers",
        compute: |cx| {
            Ok(credit(
                "developer",
                cx.row.developer_name.as_deref(),
                cx.row.developer_url.as_deref(),
            ))
        },
    },
    FieldRule {
        applies: |cx| cx.row.publisher_name.is_some(),
        field: "publishers",
        compute: |cx| {
            Ok(credit(
                "publisher",
                cx.row.publisher_name.as_deref(),
                cx.row.publisher_url.as_deref(),
            ))
        },
    },
    FieldRule {
        applies: |cx| cx.row.callout.is_some(),
        field: "front-page-subtitle",
        compute: |cx| Ok(cx.row.callout.as_deref().map(|c| Literal::Str(text(c)))),
    },
    FieldRule {
        applies: |cx| cx.row.audio,
        field: "soundtrack-hide-tracklist",
        compute: |_| Ok(Some(Literal::Bool(true))),
    },
    FieldRule {
        applies: |cx| cx.row.audio,
        field: "soundtrack-listing",
        compute: |cx| {
            let track = Literal::map()
                .entry(
                    "preview-url",
                    Literal::Str(format!("ops/audio/{}_preview.mp3", cx.machine_name)),
                )
                .entry("track-name", Literal::str("Excerpt"))
                .entry("track-number", Literal::str("1"))
                .build();
            Ok(Some(Literal::List(vec![track])))
        },
    },
    FieldRule {
        applies: |cx| cx.row.youtube.is_some(),
        field: "youtube-link",
        compute: |cx| Ok(cx.row.youtube.as_deref().map(Literal::str)),
    },
];

/// Importer text: no raw newlines.
fn text(value: &str) -> String {
    value.replace("\r\n", "\n").replace('\n', "<br />")
}

fn credit(kind: &str, name: Option<&str>, url: Option<&str>) -> Option<Literal> {
    let name = name?;
    let entry = Literal::map()
        .entry(format!("{kind}-name"), Literal::str(name))
        .opt(format!("{kind}-url"), url.map(Literal::str))
        .build();
    Some(Literal::List(vec![entry]))
}

fn platform_content(cx: &ItemContext) -> Result<Option<Literal>> {
    let mut devices = Literal::map();
    for (device, table) in cx.device_drms()? {
        let mut drms = Literal::map();
        for drm in &cx.row.drm {
            let Some((_, supported)) = table.iter().find(|(name, _)| name == drm) else {
                continue;
            };
            let platforms = cx
                .row
                .platform
                .iter()
                .filter(|p| supported.contains(&p.as_str()))
                .map(Literal::str)
                .collect();
            drms = drms.entry(drm.as_str(), Literal::List(platforms));
        }
        devices = devices.entry(device, drms.build());
    }
    Ok(Some(devices.build()))
}

fn unavailable_platforms(cx: &ItemContext) -> Result<Option<Literal>> {
    let mut seen: Vec<&str> = Vec::new();
    let mut unavailable = Literal::map();

    for (_, table) in cx.device_drms()? {
        for drm in &cx.row.drm {
            let Some((_, supported)) = table.iter().find(|(name, _)| name == drm) else {
                continue;
            };
            if seen.contains(&drm.as_str()) {
                continue;
            }
            seen.push(drm.as_str());

            let missing: Vec<Literal> = supported
                .iter()
                .filter(|p| **p != "android" && !cx.row.platform.iter().any(|sel| sel == *p))
                .map(|p| Literal::str(*p))
                .collect();
            if !missing.is_empty() {
                unavailable = unavailable.entry(drm.as_str(), Literal::List(missing));
            }
        }
    }

    match unavailable.build() {
        Literal::Map(entries) if entries.is_empty() => Ok(None),
        built => Ok(Some(built)),
    }
}

/// Each list names struct keys, so a repeated entry would emit a key twice.
fn check_unique(row: &DisplayItemRow, column: &str, values: &[String]) -> Result<()> {
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(SotbError::row(
                row.line,
                format!("{column} lists '{value}' more than once"),
            ));
        }
    }
    Ok(())
}

fn build_item(row: &DisplayItemRow, machine_name: &str) -> Result<Literal> {
    let override_key = row.r#override.as_deref().unwrap_or(DEFAULT_OVERRIDE);
    if override_key == BASE_STRUCT {
        return Err(SotbError::row(
            row.line,
            format!("override cannot be '{BASE_STRUCT}'"),
        ));
    }
    check_unique(row, "device", &row.device)?;
    check_unique(row, "drm", &row.drm)?;

    let cx = ItemContext {
        row,
        machine_name,
        override_key,
    };

    if row.pdf_preview || row.audio {
        warn!(
            machine_name,
            pdf_preview = row.pdf_preview,
            audio = row.audio,
            "fill in the preview size and length by hand"
        );
    }

    let mut fields = Literal::map();
    for rule in FIELD_RULES {
        if !(rule.applies)(&cx) {
            continue;
        }
        if let Some(value) = (rule.compute)(&cx)? {
            fields = fields.entry(rule.field, value);
        }
    }

    let default = Literal::map()
        .entry("human-name", Literal::Str(text(&row.human_name)))
        .build();

    Ok(Literal::map()
        .entry("machine_name", Literal::str(machine_name))
        .entry(
            "struct",
            Literal::map()
                .entry(BASE_STRUCT, default)
                .entry(override_key, fields.build())
                .build(),
        )
        .build())
}

pub fn build_display_items(rows: &[DisplayItemRow]) -> Result<Vec<Literal>> {
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(machine_name) = row.machine_name.as_deref() else {
            debug!(line = row.line, "skipping row without machine-name");
            continue;
        };
        items.push(build_item(row, machine_name)?);
    }
    Ok(items)
}

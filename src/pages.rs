//! Server-rendered HTML for the gallery, upload form and detail pages.
//! Every client-supplied string passes through `escape_html`.

use crate::models::{Picture, ALLOWED_MIME_TYPES};

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/css/style.css">
</head>
<body>
<nav><a href="/">Gallery</a> <a href="/upload">Upload</a></nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

/// Size ceilings read best in whole MB; anything else falls back to `format_size`
pub fn format_limit(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{}MB", bytes / MIB)
    } else {
        format_size(bytes as i64)
    }
}

fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

pub fn gallery_page(pictures: &[Picture], total: i64, error: Option<&str>) -> String {
    let mut body = String::from("<h1>Picture Gallery</h1>\n");

    if let Some(error) = error {
        body.push_str(&format!(
            "<div class=\"alert alert-error\">{}</div>\n",
            escape_html(error)
        ));
    }

    if pictures.is_empty() {
        body.push_str("<p class=\"empty\">No pictures yet. <a href=\"/upload\">Upload some</a>.</p>\n");
    } else {
        body.push_str(&format!(
            "<p class=\"count\">Showing {} of {} pictures</p>\n<div class=\"gallery\">\n",
            pictures.len(),
            total
        ));
        for picture in pictures {
            let handle = picture.handle();
            body.push_str(&format!(
                r#"<a class="card" href="/picture/{id}"><img src="{thumb}" alt="{alt}" loading="lazy"><span>{name}</span></a>
"#,
                id = picture.id,
                thumb = escape_html(&handle.thumbnail_url()),
                alt = escape_html(&picture.description),
                name = escape_html(&picture.original_name),
            ));
        }
        body.push_str("</div>\n");
    }

    layout("Picture Gallery", &body)
}

pub fn upload_page(max_files: usize, max_file_size: usize) -> String {
    let body = format!(
        r#"<h1>Upload Pictures</h1>
<form id="upload-form" action="/api/pictures" method="post" enctype="multipart/form-data">
<input type="file" name="pictures" accept="{accept}" multiple required>
<textarea name="description" placeholder="Description (optional)"></textarea>
<p class="hint">Up to {max_files} files, {max_size} each.</p>
<button type="submit">Upload</button>
</form>
"#,
        accept = ALLOWED_MIME_TYPES.join(","),
        max_files = max_files,
        max_size = format_limit(max_file_size),
    );
    layout("Upload Pictures", &body)
}

pub fn detail_page(picture: &Picture) -> String {
    let handle = picture.handle();
    let dimensions = match (picture.width, picture.height) {
        (Some(w), Some(h)) => format!("{} × {}", w, h),
        _ => "unknown".to_string(),
    };
    let body = format!(
        r#"<h1>{name}</h1>
<figure><img src="{src}" alt="{alt}"></figure>
<p class="description" data-picture-id="{id}">{description}</p>
<dl>
<dt>Size</dt><dd>{size}</dd>
<dt>Type</dt><dd>{mime}</dd>
<dt>Dimensions</dt><dd>{dimensions}</dd>
<dt>Uploaded</dt><dd>{uploaded}</dd>
<dt>Updated</dt><dd>{updated}</dd>
</dl>
"#,
        name = escape_html(&picture.original_name),
        src = escape_html(&handle.original_url()),
        alt = escape_html(&picture.description),
        id = picture.id,
        description = escape_html(&picture.description),
        size = format_size(picture.file_size),
        mime = escape_html(&picture.mime_type),
        dimensions = dimensions,
        uploaded = escape_html(&picture.upload_date),
        updated = escape_html(&picture.updated_date),
    );
    layout(&picture.original_name, &body)
}

pub fn error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Back to the gallery</a></p>\n",
        escape_html(title),
        escape_html(message)
    );
    layout(title, &body)
}

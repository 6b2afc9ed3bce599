//! Print-dialog payload.
//!
//! A capture destined for the platform print dialog is wrapped in a minimal
//! HTML document: one image element carrying the raster inline as a data URI,
//! sized to fill the viewport with *contain* fit (never cover, since the
//! physical paper is not guaranteed to match the sticker ratio), with no
//! margins and print-exact color adjustment. The page asks to print as soon
//! as the image has loaded and closes itself once the interaction ends.

use base64::Engine as _;

use crate::error::{Error, Result};
use crate::{sticker_file_name, Raster};

/// A self-printing document ready to hand to the platform.
#[derive(Debug, Clone)]
pub struct PrintJob {
    /// Complete HTML payload
    pub html: String,
    /// Suggested file name when the payload is written out
    pub file_name: String,
}

impl PrintJob {
    /// Write the payload to `path`, creating or truncating the file.
    pub fn write_to(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, &self.html)
            .map_err(|e| Error::Encoding(format!("failed to write print payload: {}", e)))
    }
}

/// Build the print payload for a captured raster.
pub fn build_print_job(raster: &Raster, business_name: &str) -> PrintJob {
    let data_uri = format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(&raster.png_data)
    );

    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<title>{title}</title>\n<style>\n\
         html, body {{ margin: 0; padding: 0; width: 100%; height: 100%; }}\n\
         img {{\n\
           display: block;\n\
           width: 100vw;\n\
           height: 100vh;\n\
           object-fit: contain;\n\
           -webkit-print-color-adjust: exact;\n\
           print-color-adjust: exact;\n\
         }}\n\
         @page {{ margin: 0; }}\n\
         </style>\n</head>\n<body>\n\
         <img src=\"{src}\" onload=\"window.print()\">\n\
         <script>window.onafterprint = function () {{ window.close(); }};</script>\n\
         </body>\n</html>\n",
        title = business_name,
        src = data_uri,
    );

    PrintJob {
        html,
        file_name: sticker_file_name(business_name, "html"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn raster() -> Raster {
        let pixels = RgbaImage::from_pixel(4, 8, Rgba([9, 9, 9, 255]));
        Raster {
            width: 4,
            height: 8,
            png_data: crate::compose::encode_png(&pixels).expect("encode"),
        }
    }

    #[test]
    fn payload_contains_inline_image_and_print_hooks() {
        let job = build_print_job(&raster(), "Cafe Mondo");
        assert!(job.html.contains("data:image/png;base64,"));
        assert!(job.html.contains("object-fit: contain"));
        assert!(job.html.contains("window.print()"));
        assert!(job.html.contains("onafterprint"));
        assert!(job.html.contains("@page { margin: 0; }"));
        assert_eq!(job.file_name, "cafe-mondo-sticker.html");
    }

    #[test]
    fn inline_image_survives_a_round_trip() {
        let job = build_print_job(&raster(), "x");
        let start = job.html.find("base64,").unwrap() + "base64,".len();
        let end = job.html[start..].find('"').unwrap() + start;
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&job.html[start..end])
            .expect("base64");
        assert_eq!(crate::compose::decode_dimensions(&bytes).unwrap(), (4, 8));
    }
}

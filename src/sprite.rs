use std::fs;
use std::path::Path;

use log::info;

use crate::colors::{PlantSource, THEME_NAMES, Theme};
use crate::error::Result;

const ICON_SIZE: u32 = 24;

/// Round plant marker in the category color with a halo matching the theme.
fn plant_icon_svg(source: PlantSource, theme: Theme) -> String {
    let palette = theme.palette();
    let r = ICON_SIZE / 2;
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{ICON_SIZE}\" height=\"{ICON_SIZE}\" \
         viewBox=\"0 0 {ICON_SIZE} {ICON_SIZE}\">\
         <circle cx=\"{r}\" cy=\"{r}\" r=\"{outer}\" fill=\"{halo}\"/>\
         <circle cx=\"{r}\" cy=\"{r}\" r=\"{inner}\" fill=\"{fill}\" \
         stroke=\"{stroke}\" stroke-width=\"1\"/>\
         </svg>\n",
        outer = r - 1,
        inner = r - 4,
        halo = palette.text_halo,
        fill = source.color(),
        stroke = palette.polygon_outline,
    )
}

/// Write one icon per plant category for every theme, as
/// `<output_dir>/<theme>/plant-<category>.svg`.
pub fn generate_plant_icons(output_dir: &Path) -> Result<usize> {
    let mut total = 0;
    for name in THEME_NAMES {
        let theme: Theme = name.parse()?;
        let theme_dir = output_dir.join(theme.as_str());
        fs::create_dir_all(&theme_dir)?;

        for source in PlantSource::ALL {
            let dest = theme_dir.join(format!("{}.svg", source.icon()));
            fs::write(&dest, plant_icon_svg(source, theme))?;
        }
        total += PlantSource::ALL.len();

        info!(
            "Generated {} plant icons for '{}'",
            PlantSource::ALL.len(),
            theme.as_str()
        );
    }
    Ok(total)
}

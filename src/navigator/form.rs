//! Search form interaction: portal entry and the cascading dropdown fill.

use tracing::{debug, info};

use crate::config::Config;
use crate::driver::UiDriver;
use crate::error::{AppError, AppResult};
use crate::models::SearchCriteria;
use crate::retry;

// Element ids the portal's search form exposes.
pub const SEL_YEAR: &str = "#ddlFromYear1";
pub const SEL_DISTRICT: &str = "#ddlDistrict1";
pub const SEL_TAHSIL: &str = "#ddltahsil";
pub const SEL_VILLAGE: &str = "#ddlvillage";
pub const SEL_PROPERTY: &str = "#txtAttributeValue1";
pub const SEL_CAPTCHA_IMAGE: &str = "#imgCaptcha_new";
pub const SEL_CAPTCHA_INPUT: &str = "#txtImg1";
pub const SEL_SEARCH_BUTTON: &str = "#btnSearch_RestMaha";
pub const SEL_OTHER_DISTRICTS: &str = "#btnOtherdistrictSearch";
pub const SEL_POPUP_CLOSE: &str = ".btnclose";

/// Navigate to the portal and get the "Rest of Maharashtra" search form on
/// screen: dismiss the landing popup when it shows, switch search modes,
/// and wait for the year dropdown to populate.
pub async fn open_portal<D: UiDriver>(driver: &D, config: &Config) -> AppResult<()> {
    driver.navigate(&config.portal_url).await?;

    // The announcement popup does not always appear.
    if driver.click(SEL_POPUP_CLOSE).await.is_ok() {
        debug!("dismissed landing popup");
    }

    retry::bounded("open search form", 3, |_| async {
        driver.click(SEL_OTHER_DISTRICTS).await
    })
    .await?;

    wait_for_options(driver, config, SEL_YEAR, "year dropdown").await?;
    info!("✓ search form ready");
    Ok(())
}

/// Fill the form top to bottom. Each location select triggers a server
/// round trip that repopulates the next dropdown, so every step waits for
/// its options before selecting.
pub async fn fill_form<D: UiDriver>(
    driver: &D,
    config: &Config,
    criteria: &SearchCriteria,
) -> AppResult<()> {
    select(driver, SEL_YEAR, &criteria.year).await?;

    select(driver, SEL_DISTRICT, &criteria.district).await?;
    wait_for_options(driver, config, SEL_TAHSIL, "tahsil dropdown").await?;

    select(driver, SEL_TAHSIL, &criteria.tahsil).await?;
    wait_for_options(driver, config, SEL_VILLAGE, "village dropdown").await?;

    select(driver, SEL_VILLAGE, &criteria.village).await?;
    driver.fill(SEL_PROPERTY, &criteria.property_no).await?;

    info!(
        "✓ form filled: {} / {} / {} / {} / property {}",
        criteria.year, criteria.district, criteria.tahsil, criteria.village, criteria.property_no
    );
    Ok(())
}

/// Select by visible text. The option not existing after location
/// validation passed means the portal and the location data disagree,
/// which no retry can fix.
async fn select<D: UiDriver>(driver: &D, selector: &str, text: &str) -> AppResult<()> {
    if driver.select_by_text(selector, text).await? {
        Ok(())
    } else {
        Err(AppError::fatal(format!(
            "option '{}' not present in {}",
            text, selector
        )))
    }
}

/// A dropdown is populated once it holds more than its placeholder option.
async fn wait_for_options<D: UiDriver>(
    driver: &D,
    config: &Config,
    selector: &str,
    what: &str,
) -> AppResult<()> {
    retry::poll_until(config.dropdown_wait, config.poll_interval, || async {
        match driver.options_count(selector).await {
            Ok(n) if n > 1 => Some(()),
            _ => None,
        }
    })
    .await
    .ok_or_else(|| AppError::wait_timeout(what, config.dropdown_wait.as_secs()))
}

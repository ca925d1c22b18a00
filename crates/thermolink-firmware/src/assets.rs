use thermolink_core::http::Assets;

pub const ASSETS: Assets = Assets {
    index_html: include_bytes!("../web/index.html"),
    main_css: include_bytes!("../web/main.css"),
    app_js: include_bytes!("../web/app.js"),
};

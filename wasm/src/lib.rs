use sankey_barchart::render::stylesheet;
use sankey_barchart::{ChartConfig, HtmlWidget, WidgetPayload};
use wasm_bindgen::prelude::*;

fn render_value_html(widget: &mut HtmlWidget, payload_json: &str) -> Result<String, String> {
    let payload = WidgetPayload::from_json(payload_json).map_err(|error| error.to_string())?;
    widget
        .render_value(&payload)
        .map(str::to_string)
        .map_err(|error| error.to_string())
}

fn resize_html(widget: &mut HtmlWidget, width: f64, height: f64) -> Result<String, String> {
    widget
        .resize(width, height)
        .map(str::to_string)
        .map_err(|error| error.to_string())
}

fn stylesheet_css(options_json: Option<&str>) -> Result<String, String> {
    let options = match options_json {
        Some(raw) => serde_json::from_str::<serde_json::Value>(raw).map_err(|error| error.to_string())?,
        None => serde_json::Value::Null,
    };
    let config = ChartConfig::from_value(&options).map_err(|error| error.to_string())?;
    Ok(stylesheet(&config.theme))
}

/// One widget instance per host element. The host sets the element's
/// `innerHTML` to whatever `renderValue`/`resize` return.
#[wasm_bindgen]
pub struct SankeyBarChartWidget {
    inner: HtmlWidget,
}

#[wasm_bindgen]
impl SankeyBarChartWidget {
    #[wasm_bindgen(constructor)]
    pub fn new(id: String, width: f64, height: f64) -> Self {
        Self {
            inner: HtmlWidget::factory(id, width, height),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn name(&self) -> String {
        self.inner.name().to_string()
    }

    #[wasm_bindgen(js_name = renderValue)]
    pub fn render_value(&mut self, payload_json: &str) -> Result<String, JsValue> {
        render_value_html(&mut self.inner, payload_json).map_err(|error| JsValue::from_str(&error))
    }

    pub fn resize(&mut self, width: f64, height: f64) -> Result<String, JsValue> {
        resize_html(&mut self.inner, width, height).map_err(|error| JsValue::from_str(&error))
    }
}

#[wasm_bindgen(js_name = renderSankeyBarchart)]
pub fn render_sankey_barchart(payload_json: &str, width: f64, height: f64) -> Result<String, JsValue> {
    let mut widget = HtmlWidget::factory("sankey-barchart", width, height);
    render_value_html(&mut widget, payload_json).map_err(|error| JsValue::from_str(&error))
}

#[wasm_bindgen(js_name = sankeyBarchartStylesheet)]
pub fn sankey_barchart_stylesheet(options_json: Option<String>) -> Result<String, JsValue> {
    stylesheet_css(options_json.as_deref()).map_err(|error| JsValue::from_str(&error))
}

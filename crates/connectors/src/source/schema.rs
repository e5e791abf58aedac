use model::mapping::FieldMapping;

/// Column layout of the flattened legacy product table. Discovery produces
/// a `FieldMapping` that can override any of these; the defaults match the
/// legacy storefront's conventional names.
#[derive(Debug, Clone)]
pub struct ProductColumns {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: String,
    pub special_price: String,
    pub special_from: String,
    pub special_to: String,
    pub weight: String,
    pub weight_unit: String,
    pub length: String,
    pub width: String,
    pub height: String,
    pub dimension_unit: String,
}

impl Default for ProductColumns {
    fn default() -> Self {
        ProductColumns {
            id: "id".into(),
            sku: "sku".into(),
            name: "name".into(),
            description: "description".into(),
            brand: "brand".into(),
            price: "price".into(),
            special_price: "special_price".into(),
            special_from: "special_from".into(),
            special_to: "special_to".into(),
            weight: "weight".into(),
            weight_unit: "weight_unit".into(),
            length: "length".into(),
            width: "width".into(),
            height: "height".into(),
            dimension_unit: "dimension_unit".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceSchema {
    pub product_table: String,
    pub image_table: String,
    pub category_table: String,
    pub product_category_table: String,
    pub tag_table: String,
    pub product: ProductColumns,
}

impl Default for SourceSchema {
    fn default() -> Self {
        SourceSchema {
            product_table: "catalog_product".into(),
            image_table: "catalog_product_image".into(),
            category_table: "catalog_category".into(),
            product_category_table: "catalog_product_category".into(),
            tag_table: "catalog_product_tag".into(),
            product: ProductColumns::default(),
        }
    }
}

impl SourceSchema {
    /// Overlays a discovery-generated mapping on top of the defaults.
    pub fn with_mapping(mapping: &FieldMapping) -> Self {
        let mut schema = SourceSchema::default();
        if let Some(table) = &mapping.source_table {
            schema.product_table = table.clone();
        }
        let cols = &mut schema.product;
        let mut overlay = |target: &str, slot: &mut String| {
            if let Some(source) = mapping.source_column(target) {
                *slot = source.to_string();
            }
        };
        overlay("id", &mut cols.id);
        overlay("sku", &mut cols.sku);
        overlay("name", &mut cols.name);
        overlay("description", &mut cols.description);
        overlay("brand", &mut cols.brand);
        overlay("price", &mut cols.price);
        overlay("special_price", &mut cols.special_price);
        overlay("special_from", &mut cols.special_from);
        overlay("special_to", &mut cols.special_to);
        overlay("weight", &mut cols.weight);
        overlay("weight_unit", &mut cols.weight_unit);
        overlay("length", &mut cols.length);
        overlay("width", &mut cols.width);
        overlay("height", &mut cols.height);
        overlay("dimension_unit", &mut cols.dimension_unit);
        schema
    }
}

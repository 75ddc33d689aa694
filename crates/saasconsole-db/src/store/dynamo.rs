//! DynamoDB store backend

use super::schema::{name_placeholder, value_placeholder, INDEXES, KEY_ATTRIBUTES};
use super::{
    FilterOp, Item, ItemKey, ItemStore, Page, Query, SortCondition, StoreError, StoreResult,
    UpdateRequest, WriteRequest,
};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, DeleteRequest, GlobalSecondaryIndex,
    KeySchemaElement, KeyType, Projection, ProjectionType, PutRequest, ReturnValue,
    ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use aws_smithy_types::timeout::TimeoutConfig;
use saasconsole_core::constants::{ATTR_PK, ATTR_SK, BATCH_LIMIT};
use saasconsole_core::StoreBackend;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::time::Duration;

type AttributeMap = HashMap<String, AttributeValue>;

const MAX_BATCH_ATTEMPTS: u32 = 5;

/// Configuration for the DynamoDB backend
#[derive(Debug, Clone)]
pub struct DynamoStoreConfig {
    pub table_name: String,
    /// Region override; the SDK default chain is used otherwise
    pub region: Option<String>,
    /// Endpoint override (DynamoDB Local, LocalStack)
    pub endpoint: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Clone)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
}

impl std::fmt::Debug for DynamoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl DynamoStore {
    pub fn new(sdk_config: &aws_config::SdkConfig, config: DynamoStoreConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        if let Some(region) = config.region {
            builder = builder.region(aws_sdk_dynamodb::config::Region::new(region));
        }

        if let Some(endpoint) = config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table_name: config.table_name,
        }
    }

    pub fn from_client(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }

    /// Create the table and its indexes when it does not exist yet.
    ///
    /// Meant for local endpoints; production tables are provisioned separately.
    pub async fn ensure_table(&self) -> StoreResult<()> {
        use aws_sdk_dynamodb::operation::create_table::CreateTableError;
        use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;

        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => return Ok(()),
            Err(SdkError::ServiceError(e))
                if matches!(e.err(), DescribeTableError::ResourceNotFoundException(_)) => {}
            Err(e) => return Err(backend_error("DescribeTable", e)),
        }

        let definitions = KEY_ATTRIBUTES
            .iter()
            .map(|attr| {
                AttributeDefinition::builder()
                    .attribute_name(*attr)
                    .attribute_type(ScalarAttributeType::S)
                    .build()
                    .map_err(config_error)
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let indexes = INDEXES
            .iter()
            .map(|index| {
                GlobalSecondaryIndex::builder()
                    .index_name(index.as_str())
                    .key_schema(key_element(index.partition_attr(), KeyType::Hash)?)
                    .key_schema(key_element(index.sort_attr(), KeyType::Range)?)
                    .projection(
                        Projection::builder()
                            .projection_type(ProjectionType::All)
                            .build(),
                    )
                    .build()
                    .map_err(config_error)
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let result = self
            .client
            .create_table()
            .table_name(&self.table_name)
            .set_attribute_definitions(Some(definitions))
            .key_schema(key_element(ATTR_PK, KeyType::Hash)?)
            .key_schema(key_element(ATTR_SK, KeyType::Range)?)
            .set_global_secondary_indexes(Some(indexes))
            .billing_mode(BillingMode::PayPerRequest)
            .send()
            .await;

        match result {
            Ok(_) => {
                tracing::info!(table = %self.table_name, "Created DynamoDB table");
                Ok(())
            }
            // Another instance created it in the meantime
            Err(SdkError::ServiceError(e))
                if matches!(e.err(), CreateTableError::ResourceInUseException(_)) =>
            {
                Ok(())
            }
            Err(e) => Err(backend_error("CreateTable", e)),
        }
    }

    fn key_map(key: &ItemKey) -> AttributeMap {
        HashMap::from([
            (ATTR_PK.to_string(), AttributeValue::S(key.pk.clone())),
            (ATTR_SK.to_string(), AttributeValue::S(key.sk.clone())),
        ])
    }

    async fn query_page(
        &self,
        query: &Query,
        start: Option<AttributeMap>,
        page_limit: Option<usize>,
    ) -> StoreResult<(Vec<AttributeMap>, Option<AttributeMap>)> {
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .set_index_name(query.index.map(|i| i.as_str().to_string()))
            .scan_index_forward(query.scan_forward)
            .expression_attribute_names("#pk", query.partition_attr())
            .expression_attribute_values(":pk", AttributeValue::S(query.partition.clone()))
            .set_exclusive_start_key(start);

        let key_condition = match &query.sort {
            None => "#pk = :pk".to_string(),
            Some(condition) => {
                let (expr, value) = match condition {
                    SortCondition::Eq(v) => ("#sk = :sk", v),
                    SortCondition::BeginsWith(v) => ("begins_with(#sk, :sk)", v),
                    SortCondition::LessOrEqual(v) => ("#sk <= :sk", v),
                };
                request = request
                    .expression_attribute_names("#sk", query.sort_attr())
                    .expression_attribute_values(":sk", AttributeValue::S(value.clone()));
                format!("#pk = :pk AND {}", expr)
            }
        };
        request = request.key_condition_expression(key_condition);

        let mut clauses = Vec::new();
        for (n, filter) in query.filters.iter().enumerate() {
            let name = name_placeholder("f", n);
            request = request.expression_attribute_names(&name, &filter.attr);
            let clause = match &filter.op {
                FilterOp::Eq(v) => {
                    let value = value_placeholder("f", n);
                    request = request.expression_attribute_values(&value, to_attr(v));
                    format!("{} = {}", name, value)
                }
                FilterOp::Ne(v) => {
                    let value = value_placeholder("f", n);
                    request = request.expression_attribute_values(&value, to_attr(v));
                    format!("(attribute_not_exists({0}) OR {0} <> {1})", name, value)
                }
                FilterOp::Contains(needle) => {
                    let value = value_placeholder("f", n);
                    request = request
                        .expression_attribute_values(&value, AttributeValue::S(needle.clone()));
                    format!("contains({}, {})", name, value)
                }
                FilterOp::In(values) | FilterOp::NotIn(values) => {
                    let mut placeholders = Vec::with_capacity(values.len());
                    for (m, v) in values.iter().enumerate() {
                        let value = value_placeholder(&format!("f{}_", n), m);
                        request = request.expression_attribute_values(&value, to_attr(v));
                        placeholders.push(value);
                    }
                    let set = format!("{} IN ({})", name, placeholders.join(", "));
                    if matches!(filter.op, FilterOp::In(_)) {
                        set
                    } else {
                        format!("(attribute_not_exists({0}) OR NOT ({1}))", name, set)
                    }
                }
            };
            clauses.push(clause);
        }
        if !clauses.is_empty() {
            request = request.filter_expression(clauses.join(" AND "));
        }

        if let Some(limit) = page_limit {
            request = request.limit(i32::try_from(limit).unwrap_or(i32::MAX));
        }

        let response = request
            .send()
            .await
            .map_err(|e| backend_error("Query", e))?;

        let next = response
            .last_evaluated_key()
            .filter(|k| !k.is_empty())
            .cloned();
        Ok((response.items().to_vec(), next))
    }
}

#[async_trait]
impl ItemStore for DynamoStore {
    async fn get(&self, key: &ItemKey) -> StoreResult<Option<Item>> {
        let response = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_map(key)))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| backend_error("GetItem", e))?;

        response.item().map(from_attr_map).transpose()
    }

    async fn put(&self, item: Item) -> StoreResult<()> {
        ItemKey::of(&item)?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attr_map(&item)))
            .send()
            .await
            .map_err(|e| backend_error("PutItem", e))?;
        Ok(())
    }

    async fn put_if_absent(&self, item: Item) -> StoreResult<()> {
        use aws_sdk_dynamodb::operation::put_item::PutItemError;

        let key = ItemKey::of(&item)?;
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attr_map(&item)))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", ATTR_PK)
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(SdkError::ServiceError(e))
                if matches!(e.err(), PutItemError::ConditionalCheckFailedException(_)) =>
            {
                Err(StoreError::ConditionFailed(format!(
                    "row {} / {} already exists",
                    key.pk, key.sk
                )))
            }
            Err(e) => Err(backend_error("PutItem", e)),
        }
    }

    async fn update(&self, key: &ItemKey, update: UpdateRequest) -> StoreResult<Option<Item>> {
        use aws_sdk_dynamodb::operation::update_item::UpdateItemError;

        if update.is_empty() {
            return self.get(key).await;
        }

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_map(key)))
            .condition_expression("attribute_exists(#pk)")
            .expression_attribute_names("#pk", ATTR_PK)
            .return_values(ReturnValue::AllNew);

        let mut sets = Vec::with_capacity(update.set.len());
        for (n, (attr, value)) in update.set.iter().enumerate() {
            let name = name_placeholder("s", n);
            let placeholder = value_placeholder("s", n);
            request = request
                .expression_attribute_names(&name, attr)
                .expression_attribute_values(&placeholder, to_attr(value));
            sets.push(format!("{} = {}", name, placeholder));
        }
        let mut removes = Vec::with_capacity(update.remove.len());
        for (n, attr) in update.remove.iter().enumerate() {
            let name = name_placeholder("r", n);
            request = request.expression_attribute_names(&name, attr);
            removes.push(name);
        }

        let mut expression = Vec::new();
        if !sets.is_empty() {
            expression.push(format!("SET {}", sets.join(", ")));
        }
        if !removes.is_empty() {
            expression.push(format!("REMOVE {}", removes.join(", ")));
        }

        let result = request
            .update_expression(expression.join(" "))
            .send()
            .await;

        match result {
            Ok(output) => output.attributes().map(from_attr_map).transpose(),
            Err(SdkError::ServiceError(e))
                if matches!(e.err(), UpdateItemError::ConditionalCheckFailedException(_)) =>
            {
                Ok(None)
            }
            Err(e) => Err(backend_error("UpdateItem", e)),
        }
    }

    async fn delete(&self, key: &ItemKey) -> StoreResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key_map(key)))
            .send()
            .await
            .map_err(|e| backend_error("DeleteItem", e))?;
        Ok(())
    }

    async fn query(&self, query: Query) -> StoreResult<Page> {
        let mut page = Page::default();
        let mut start = query.exclusive_start_key.as_ref().map(to_attr_map);

        loop {
            // Without filters DynamoDB's own limit is exact
            let page_limit = match query.limit {
                Some(limit) if query.filters.is_empty() => {
                    Some(limit.saturating_sub(page.items.len()).max(1))
                }
                _ => None,
            };
            let (items, next) = self.query_page(&query, start.take(), page_limit).await?;
            let count = items.len();

            for (idx, raw) in items.iter().enumerate() {
                page.items.push(from_attr_map(raw)?);
                if query.limit.is_some_and(|limit| page.items.len() >= limit) {
                    if idx + 1 < count || next.is_some() {
                        page.last_evaluated_key =
                            page.items.last().map(|item| query.position_of(item));
                    }
                    return Ok(page);
                }
            }

            match next {
                Some(key) => start = Some(key),
                None => return Ok(page),
            }
        }
    }

    async fn batch_write(&self, writes: Vec<WriteRequest>) -> StoreResult<()> {
        for chunk in writes.chunks(BATCH_LIMIT) {
            let mut requests = chunk
                .iter()
                .map(to_write_request)
                .collect::<StoreResult<Vec<_>>>()?;

            for attempt in 0..MAX_BATCH_ATTEMPTS {
                let response = self
                    .client
                    .batch_write_item()
                    .request_items(&self.table_name, requests)
                    .send()
                    .await
                    .map_err(|e| backend_error("BatchWriteItem", e))?;

                requests = response
                    .unprocessed_items()
                    .and_then(|m| m.get(&self.table_name))
                    .cloned()
                    .unwrap_or_default();
                if requests.is_empty() {
                    break;
                }
                tracing::debug!(
                    unprocessed = requests.len(),
                    attempt,
                    "Retrying unprocessed batch writes"
                );
                tokio::time::sleep(Duration::from_millis(50 * 2u64.pow(attempt))).await;
            }

            if !requests.is_empty() {
                return Err(StoreError::BackendError(format!(
                    "{} batch writes left unprocessed",
                    requests.len()
                )));
            }
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|e| backend_error("DescribeTable", e))?;
        Ok(())
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::DynamoDb
    }
}

fn backend_error(operation: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::BackendError(format!("DynamoDB {} failed: {}", operation, err))
}

fn config_error(err: impl std::fmt::Display) -> StoreError {
    StoreError::ConfigError(err.to_string())
}

fn key_element(attr: &str, key_type: KeyType) -> StoreResult<KeySchemaElement> {
    KeySchemaElement::builder()
        .attribute_name(attr)
        .key_type(key_type)
        .build()
        .map_err(config_error)
}

fn to_write_request(write: &WriteRequest) -> StoreResult<aws_sdk_dynamodb::types::WriteRequest> {
    let request = match write {
        WriteRequest::Put(item) => {
            ItemKey::of(item)?;
            let put = PutRequest::builder()
                .set_item(Some(to_attr_map(item)))
                .build()
                .map_err(config_error)?;
            aws_sdk_dynamodb::types::WriteRequest::builder()
                .put_request(put)
                .build()
        }
        WriteRequest::Delete(key) => {
            let delete = DeleteRequest::builder()
                .set_key(Some(DynamoStore::key_map(key)))
                .build()
                .map_err(config_error)?;
            aws_sdk_dynamodb::types::WriteRequest::builder()
                .delete_request(delete)
                .build()
        }
    };
    Ok(request)
}

fn to_attr(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(values) => AttributeValue::L(values.iter().map(to_attr).collect()),
        Value::Object(map) => AttributeValue::M(to_attr_map(map)),
    }
}

fn to_attr_map(item: &Item) -> AttributeMap {
    item.iter()
        .map(|(k, v)| (k.clone(), to_attr(v)))
        .collect()
}

fn from_attr(attr: &AttributeValue) -> StoreResult<Value> {
    let value = match attr {
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n)?,
        AttributeValue::L(values) => {
            Value::Array(values.iter().map(from_attr).collect::<StoreResult<_>>()?)
        }
        AttributeValue::M(map) => Value::Object(from_attr_map(map)?),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => {
            Value::Array(values.iter().map(|n| parse_number(n)).collect::<StoreResult<_>>()?)
        }
        other => {
            return Err(StoreError::InvalidItem(format!(
                "unsupported attribute type: {:?}",
                other
            )))
        }
    };
    Ok(value)
}

fn from_attr_map(map: &AttributeMap) -> StoreResult<Item> {
    map.iter()
        .map(|(k, v)| Ok((k.clone(), from_attr(v)?)))
        .collect()
}

fn parse_number(n: &str) -> StoreResult<Value> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Value::Number(i.into()));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Value::Number(u.into()));
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::InvalidItem(format!("invalid number attribute: {}", n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_conversion_keeps_shape() {
        let value = json!({
            "PK": "COMPANY#1",
            "Count": 3,
            "Ratio": 0.5,
            "IsSeen": false,
            "Logo": null,
            "RoleIDs": ["a", "b"],
            "Content": {"Title": "hi"}
        });
        let Value::Object(item) = value.clone() else {
            unreachable!()
        };
        let back = from_attr_map(&to_attr_map(&item)).unwrap();
        assert_eq!(Value::Object(back), value);
    }

    #[test]
    fn test_string_sets_read_as_arrays() {
        let attr = AttributeValue::Ss(vec!["x".into(), "y".into()]);
        assert_eq!(from_attr(&attr).unwrap(), json!(["x", "y"]));
    }
}

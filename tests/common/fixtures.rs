//! Workbook, ledger and run fixtures

use fieldgraph_engine::relations::ObjectRef;
use fieldgraph_engine::{ProcessedUnit, UnitStatus};

/// Capacity (ranged measure), Revenue, Cost, Region and the calculated
/// Margin over Revenue and Cost.
pub const SALES_WORKBOOK: &str = r#"<?xml version='1.0' encoding='utf-8' ?>
<workbook source-build='2023.1.0' version='18.1'>
  <datasources>
    <datasource caption='Sales' name='federated.0abc'>
      <column caption='Capacity' datatype='real' name='[Capacity]' role='measure' type='quantitative' />
      <column caption='Revenue' datatype='real' name='[Revenue]' role='measure' type='quantitative' />
      <column caption='Cost' datatype='real' name='[Cost]' role='measure' type='quantitative' />
      <column caption='Region' datatype='string' name='[Region]' role='dimension' type='nominal' />
      <column caption='Margin' datatype='real' name='[Calculation_1]' role='measure' type='quantitative'>
        <calculation class='tableau' formula='([Revenue]-[Cost])/[Revenue]' />
      </column>
      <column caption='Margin Band' datatype='string' name='[Calculation_2]' role='dimension' type='nominal'>
        <calculation class='tableau' formula='IF [Calculation_1] &gt; 0.2 THEN "High" ELSE "Low" END' />
      </column>
    </datasource>
  </datasources>
  <worksheets>
    <worksheet name='Margin by Region'>
      <layout-options><title><formatted-text><run>Margin by region</run></formatted-text></title></layout-options>
      <table>
        <view>
          <filter class='quantitative' column='[federated.0abc].[sum:Capacity:qk]' included-values='in-range'>
            <min>0</min>
            <max>500</max>
          </filter>
          <filter class='categorical' column='[federated.0abc].[none:Region:nk]'>
            <groupfilter function='union'>
              <groupfilter function='member' level='[none:Region:nk]' member='&quot;West&quot;' />
              <groupfilter function='member' level='[none:Region:nk]' member='&quot;East&quot;' />
            </groupfilter>
          </filter>
        </view>
        <rows>[federated.0abc].[usr:Calculation_1:qk]</rows>
        <cols>[federated.0abc].[none:Region:nk]</cols>
      </table>
    </worksheet>
  </worksheets>
</workbook>
"#;

pub const FIELD_HTML: &str = "<p><span style=\"font-size: 24px;\"><strong>Revenue</strong></span></p><p>&nbsp;</p><p><strong>Definition:</strong></p><p>Total invoiced revenue.</p><p>&nbsp;</p><hr><p>Generated documentation</p>";

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|s| s.to_string()).collect()
}

pub fn success_unit(title: &str, url: &str, objects: &[&str]) -> ProcessedUnit {
    ProcessedUnit {
        subject_title: title.to_string(),
        subject_url: url.to_string(),
        status: UnitStatus::Success,
        objects: objects
            .iter()
            .map(|name| ObjectRef {
                name: name.to_string(),
                url: String::new(),
            })
            .collect(),
    }
}
